//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// In-memory implementation of the DataStore contract, with optional loading of a JSON
// snapshot at startup. The snapshot carries users, historical orders, per-symbol book sides
// and the trade log; non-resting orders found inside a snapshot book are skipped with a
// warning instead of corrupting the rebuilt book.
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::models::types::{Order, Trade, User};
use crate::domain::services::orderbook::orderbook::OrderBook;
use crate::store::{DataStore, StoreError};

/// One side pair of a snapshot book.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotBook {
    #[serde(default)]
    pub buy_orders: Vec<Order>,
    #[serde(default)]
    pub sell_orders: Vec<Order>,
}

/// On-disk snapshot format consumed by [`InMemoryStore::from_snapshot_file`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub order_books: HashMap<String, SnapshotBook>,
    #[serde(default)]
    pub trades: Vec<Trade>,
}

/// HashMap-backed store. Lock scope is one map per operation; no await happens while a
/// lock is held.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<String, User>>,
    orders: RwLock<HashMap<Uuid, Order>>,
    books: RwLock<HashMap<String, OrderBook>>,
    trades: RwLock<Vec<Trade>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store primed from a JSON snapshot file.
    pub fn from_snapshot_file(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&raw)?;
        let store = Self::new();
        store.load_snapshot(snapshot);
        info!("loaded snapshot from {}", path.display());
        Ok(store)
    }

    /// Loads a snapshot into the store, rebuilding each symbol's book from its side lists.
    pub fn load_snapshot(&self, snapshot: Snapshot) {
        {
            let mut users = self.users.write();
            for user in snapshot.users {
                users.insert(user.id.clone(), user);
            }
        }
        {
            let mut orders = self.orders.write();
            for order in snapshot.orders {
                orders.insert(order.id, order);
            }
        }
        {
            let mut books = self.books.write();
            for (symbol, sides) in snapshot.order_books {
                let mut book = OrderBook::new(symbol.clone());
                for order in sides.buy_orders.into_iter().chain(sides.sell_orders) {
                    // Keep resting orders queryable even when they cannot rebuild the book.
                    self.orders.write().entry(order.id).or_insert_with(|| order.clone());
                    if let Err(err) = book.insert(order) {
                        warn!("skipping snapshot order for {symbol}: {err}");
                    }
                }
                books.insert(symbol, book);
            }
        }
        {
            let mut trades = self.trades.write();
            trades.extend(snapshot.trades);
        }
    }
}

#[async_trait]
impl DataStore for InMemoryStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        self.users.write().insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().get(&order_id).cloned())
    }

    async fn save_order(&self, order: &Order) -> Result<(), StoreError> {
        self.orders.write().insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order_book(&self, symbol: &str) -> Result<OrderBook, StoreError> {
        Ok(self
            .books
            .read()
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| OrderBook::new(symbol)))
    }

    async fn save_order_book(&self, book: &OrderBook) -> Result<(), StoreError> {
        self.books
            .write()
            .insert(book.symbol().to_string(), book.clone());
        Ok(())
    }

    async fn get_all_symbols(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.books.read().keys().cloned().collect())
    }

    async fn save_trade(&self, trade: &Trade) -> Result<(), StoreError> {
        self.trades.write().push(trade.clone());
        Ok(())
    }

    async fn get_trades(&self) -> Result<Vec<Trade>, StoreError> {
        Ok(self.trades.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::types::Side;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[tokio::test]
    async fn test_unknown_symbol_yields_empty_book() {
        let store = InMemoryStore::new();
        let book = store.get_order_book("NOPE").await.unwrap();
        assert_eq!(book.symbol(), "NOPE");
        assert!(book.is_empty());
    }

    #[tokio::test]
    async fn test_order_and_user_round_trip() {
        let store = InMemoryStore::new();

        let user = User::new("u1", "Alice");
        store.save_user(&user).await.unwrap();
        assert_eq!(store.get_user("u1").await.unwrap(), Some(user));
        assert_eq!(store.get_user("u2").await.unwrap(), None);

        let order = Order::new("u1", Side::Buy, "ABC", 10, dec!(100));
        store.save_order(&order).await.unwrap();
        assert_eq!(store.get_order(order.id).await.unwrap(), Some(order.clone()));

        // Overwrite by id.
        let mut updated = order.clone();
        updated.quantity = 6;
        store.save_order(&updated).await.unwrap();
        assert_eq!(
            store.get_order(order.id).await.unwrap().unwrap().quantity,
            6
        );
    }

    #[tokio::test]
    async fn test_trade_log_is_append_only() {
        let store = InMemoryStore::new();
        let t1 = Trade::new(Uuid::new_v4(), Uuid::new_v4(), "ABC", 4, dec!(95));
        let t2 = Trade::new(Uuid::new_v4(), Uuid::new_v4(), "ABC", 2, dec!(96));
        store.save_trade(&t1).await.unwrap();
        store.save_trade(&t2).await.unwrap();
        assert_eq!(store.get_trades().await.unwrap(), vec![t1, t2]);
    }

    #[tokio::test]
    async fn test_snapshot_file_loading() {
        let buy = Order::new("u1", Side::Buy, "ABC", 10, dec!(100));
        let sell = Order::new("u2", Side::Sell, "ABC", 5, dec!(105));
        let snapshot = Snapshot {
            users: vec![User::new("u1", "Alice"), User::new("u2", "Bob")],
            orders: vec![],
            order_books: HashMap::from([(
                "ABC".to_string(),
                SnapshotBook {
                    buy_orders: vec![buy.clone()],
                    sell_orders: vec![sell.clone()],
                },
            )]),
            trades: vec![],
        };

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&snapshot).unwrap().as_bytes())
            .unwrap();

        let store = InMemoryStore::from_snapshot_file(file.path()).unwrap();
        assert!(store.get_user("u1").await.unwrap().is_some());
        assert_eq!(store.get_all_symbols().await.unwrap(), vec!["ABC"]);

        let book = store.get_order_book("ABC").await.unwrap();
        assert_eq!(book.len(), 2);
        assert_eq!(book.best_bid(), Some(dec!(100)));
        assert_eq!(book.best_ask(), Some(dec!(105)));

        // Book orders are also queryable by id.
        assert!(store.get_order(buy.id).await.unwrap().is_some());
        assert!(store.get_order(sell.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_snapshot_skips_non_resting_orders() {
        let mut canceled = Order::new("u1", Side::Buy, "ABC", 10, dec!(100));
        canceled.cancel();
        let snapshot = Snapshot {
            order_books: HashMap::from([(
                "ABC".to_string(),
                SnapshotBook {
                    buy_orders: vec![canceled],
                    sell_orders: vec![],
                },
            )]),
            ..Default::default()
        };

        let store = InMemoryStore::new();
        store.load_snapshot(snapshot);
        let book = store.get_order_book("ABC").await.unwrap();
        assert!(book.is_empty());
    }
}
