//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module defines the persistence boundary of the trading core. The core depends only on
// the `DataStore` contract; `memory` provides the in-process implementation used by the CLI
// and the test suite.
//
// | Component     | Description                                          |
// |---------------|------------------------------------------------------|
// | DataStore     | Abstract async persistence contract                  |
// | StoreError    | I/O and snapshot failures, propagated uninterpreted  |
// | memory        | HashMap-backed store with JSON snapshot loading      |
//--------------------------------------------------------------------------------------------------

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::types::{Order, Trade, User};
use crate::domain::services::orderbook::orderbook::OrderBook;

pub mod memory;

/// Errors surfaced by a storage backend.
///
/// The core never retries on these; any retry policy belongs to the adapter behind the
/// trait.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Snapshot file could not be read.
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file could not be parsed.
    #[error("snapshot parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Abstract persistence boundary for users, orders, order books and trades.
///
/// All operations are asynchronous; the matching loop awaits each call before deciding the
/// next pair, so a backend failure aborts the pass at a pair boundary.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Looks up a user by id. `None` if unknown.
    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Persists a user record.
    async fn save_user(&self, user: &User) -> Result<(), StoreError>;

    /// Looks up an order by id. `None` if unknown.
    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError>;

    /// Persists an order record (insert or overwrite by id).
    async fn save_order(&self, order: &Order) -> Result<(), StoreError>;

    /// Returns the book for a symbol. An unknown symbol yields an empty book, not an error.
    async fn get_order_book(&self, symbol: &str) -> Result<OrderBook, StoreError>;

    /// Persists a whole per-symbol book, replacing any previous state.
    async fn save_order_book(&self, book: &OrderBook) -> Result<(), StoreError>;

    /// Lists every symbol with a stored book. Used once at startup to prime matching.
    async fn get_all_symbols(&self) -> Result<Vec<String>, StoreError>;

    /// Appends a trade to the trade log.
    async fn save_trade(&self, trade: &Trade) -> Result<(), StoreError>;

    /// Returns all trades in execution order.
    async fn get_trades(&self) -> Result<Vec<Trade>, StoreError>;
}
