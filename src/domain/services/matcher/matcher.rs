//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the matching pass for one symbol. It converts a crossed book into a
// maximal sequence of trades under price-time priority, one best-bid/best-ask pair at a time,
// persisting each pair's orders and trade before deciding the next pair.
//
// | Component     | Description                                          |
// |---------------|------------------------------------------------------|
// | Matcher       | Store-driven matching pass                           |
// | MatcherError  | Consistency violations and propagated store failures |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                             | Return Type              |
// |-------------------------|-----------------------------------------|--------------------------|
// | match_symbol            | Drains all crossable pairs for a symbol | Result<Vec<Trade>, _>    |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::models::types::{Side, Trade};
use crate::domain::services::orderbook::orderbook::OrderBookError;
use crate::store::{DataStore, StoreError};

/// Errors that can occur during a matching pass.
#[derive(Debug, Error)]
pub enum MatcherError {
    /// A book invariant was violated mid-pass. Fatal to the pass; nothing further is
    /// matched for the symbol.
    #[error("internal consistency violation: {0}")]
    Consistency(String),

    /// Storage failure, propagated uninterpreted.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<OrderBookError> for MatcherError {
    fn from(err: OrderBookError) -> Self {
        MatcherError::Consistency(err.to_string())
    }
}

/// Type alias for Result with MatcherError.
pub type MatchResult<T> = Result<T, MatcherError>;

/// Store-driven matching pass.
///
/// The matcher loads a symbol's book, pairs the best bid with the best ask while the book
/// is crossed, and writes every updated order, every trade, and finally the residual book
/// back through the [`DataStore`]. Callers are expected to hold the symbol's lock for the
/// whole pass so no partially applied match is ever visible.
#[derive(Clone)]
pub struct Matcher {
    store: Arc<dyn DataStore>,
}

impl Matcher {
    /// Creates a matcher over the given store.
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Drains all immediately crossable pairs for `symbol` and returns the trades emitted.
    ///
    /// Each iteration takes the current best bid and best ask, trades
    /// `min(bid.quantity, ask.quantity)` at the best ask's limit price, and persists both
    /// updated orders and the trade before looking at the next pair. Orders whose quantity
    /// reaches zero transition to `Executed` and leave the book. The residual book is
    /// persisted even when no trade occurred, covering the already-non-crossed no-op case.
    ///
    /// # Errors
    ///
    /// * [`MatcherError::Consistency`] if a book invariant breaks mid-pass; the pass aborts
    ///   rather than continuing on corrupt state
    /// * [`MatcherError::Store`] on storage failure
    pub async fn match_symbol(&self, symbol: &str) -> MatchResult<Vec<Trade>> {
        let mut book = self.store.get_order_book(symbol).await?;
        let mut trades = Vec::new();

        while book.is_crossed() {
            let trade_qty = {
                let bid = book.peek_best(Side::Buy).ok_or_else(|| {
                    MatcherError::Consistency("crossed book with empty buy side".to_string())
                })?;
                let ask = book.peek_best(Side::Sell).ok_or_else(|| {
                    MatcherError::Consistency("crossed book with empty sell side".to_string())
                })?;
                bid.quantity.min(ask.quantity)
            };
            // The sell-side best order's price sets the execution price.
            let exec_price = book.best_ask().ok_or_else(|| {
                MatcherError::Consistency("crossed book with empty sell side".to_string())
            })?;

            let buy = book.fill_best(Side::Buy, trade_qty)?;
            let sell = book.fill_best(Side::Sell, trade_qty)?;
            let trade = Trade::new(buy.id, sell.id, symbol, trade_qty, exec_price);

            // Commit the pair before deciding the next one.
            self.store.save_order(&buy).await?;
            self.store.save_order(&sell).await?;
            self.store.save_trade(&trade).await?;

            info!(
                "trade {} on {}: {} @ {} (buy {} / sell {})",
                trade.id, symbol, trade_qty, exec_price, buy.id, sell.id
            );
            trades.push(trade);
        }

        self.store.save_order_book(&book).await?;
        debug!(
            "matching pass for {} done: {} trade(s), {} resting order(s)",
            symbol,
            trades.len(),
            book.len()
        );
        Ok(trades)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::types::{Order, OrderStatus};
    use crate::store::memory::InMemoryStore;
    use rust_decimal_macros::dec;

    async fn seed(store: &InMemoryStore, orders: Vec<Order>) {
        let mut book = store.get_order_book("ABC").await.unwrap();
        for order in orders {
            store.save_order(&order).await.unwrap();
            book.insert(order).unwrap();
        }
        store.save_order_book(&book).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_crossed_book_is_a_no_op() {
        let store = Arc::new(InMemoryStore::new());
        seed(
            &store,
            vec![
                Order::new("u1", crate::Side::Buy, "ABC", 10, dec!(99)),
                Order::new("u2", crate::Side::Sell, "ABC", 10, dec!(101)),
            ],
        )
        .await;

        let matcher = Matcher::new(store.clone());
        let trades = matcher.match_symbol("ABC").await.unwrap();
        assert!(trades.is_empty());

        // The residual book is persisted untouched.
        let book = store.get_order_book("ABC").await.unwrap();
        assert_eq!(book.len(), 2);
        assert!(!book.is_crossed());
    }

    #[tokio::test]
    async fn test_single_cross_trades_min_quantity_at_sell_price() {
        let store = Arc::new(InMemoryStore::new());
        let buy = Order::new("u1", crate::Side::Buy, "ABC", 10, dec!(100));
        let sell = Order::new("u2", crate::Side::Sell, "ABC", 4, dec!(95));
        seed(&store, vec![buy.clone(), sell.clone()]).await;

        let matcher = Matcher::new(store.clone());
        let trades = matcher.match_symbol("ABC").await.unwrap();

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].quantity, 4);
        assert_eq!(trades[0].price, dec!(95));
        assert_eq!(trades[0].buy_order_id, buy.id);
        assert_eq!(trades[0].sell_order_id, sell.id);

        let buy_after = store.get_order(buy.id).await.unwrap().unwrap();
        assert_eq!(buy_after.quantity, 6);
        assert_eq!(buy_after.status, OrderStatus::Accepted);

        let sell_after = store.get_order(sell.id).await.unwrap().unwrap();
        assert_eq!(sell_after.quantity, 0);
        assert_eq!(sell_after.status, OrderStatus::Executed);

        let book = store.get_order_book("ABC").await.unwrap();
        assert_eq!(book.len(), 1);
        assert!(!book.is_crossed());
        assert_eq!(store.get_trades().await.unwrap(), trades);
    }

    #[tokio::test]
    async fn test_one_order_sweeps_multiple_counterparties() {
        let store = Arc::new(InMemoryStore::new());
        let big_buy = Order::new("u1", crate::Side::Buy, "ABC", 10, dec!(100));
        let s1 = Order::new("u2", crate::Side::Sell, "ABC", 3, dec!(95));
        let s2 = Order::new("u3", crate::Side::Sell, "ABC", 4, dec!(97));
        let s3 = Order::new("u4", crate::Side::Sell, "ABC", 9, dec!(99));
        seed(&store, vec![big_buy.clone(), s1.clone(), s2.clone(), s3.clone()]).await;

        let matcher = Matcher::new(store.clone());
        let trades = matcher.match_symbol("ABC").await.unwrap();

        // Asks are consumed cheapest-first; the buy exhausts at the third.
        assert_eq!(trades.len(), 3);
        assert_eq!(
            trades.iter().map(|t| (t.quantity, t.price)).collect::<Vec<_>>(),
            vec![(3, dec!(95)), (4, dec!(97)), (3, dec!(99))]
        );

        let buy_after = store.get_order(big_buy.id).await.unwrap().unwrap();
        assert_eq!(buy_after.status, OrderStatus::Executed);
        assert_eq!(buy_after.quantity, 0);

        // The partially filled third seller keeps resting.
        let s3_after = store.get_order(s3.id).await.unwrap().unwrap();
        assert_eq!(s3_after.quantity, 6);
        assert_eq!(s3_after.status, OrderStatus::Accepted);

        let book = store.get_order_book("ABC").await.unwrap();
        assert_eq!(book.len(), 1);
        assert!(!book.is_crossed());
    }

    #[tokio::test]
    async fn test_time_priority_at_equal_price() {
        let store = Arc::new(InMemoryStore::new());
        let first = Order::new("u1", crate::Side::Buy, "ABC", 5, dec!(100));
        let mut second = Order::new("u2", crate::Side::Buy, "ABC", 5, dec!(100));
        second.created_at = first.created_at + chrono::Duration::milliseconds(10);
        let sell = Order::new("u3", crate::Side::Sell, "ABC", 5, dec!(100));
        seed(&store, vec![second.clone(), first.clone(), sell]).await;

        let matcher = Matcher::new(store.clone());
        let trades = matcher.match_symbol("ABC").await.unwrap();

        // The earlier buy at the same price must trade first.
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].buy_order_id, first.id);

        let second_after = store.get_order(second.id).await.unwrap().unwrap();
        assert_eq!(second_after.quantity, 5);
        assert_eq!(second_after.status, OrderStatus::Accepted);
    }
}
