//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the orchestration layer of the trading core. The TradingSystem owns
// user registration, order placement and cancellation, and triggers a matching pass for the
// affected symbol after every book mutation.
//
// Every mutation for a symbol (book update plus the full matching pass) runs under that
// symbol's exclusive async lock, so two concurrent placements on the same symbol never
// interleave their book state. Different symbols proceed independently.
//
// | Component      | Description                                          |
// |----------------|------------------------------------------------------|
// | TradingSystem  | Orchestrator over the DataStore and the Matcher      |
// | TradingError   | Caller-facing error taxonomy                         |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                             | Return Type              |
// |-------------------------|-----------------------------------------|--------------------------|
// | register_user           | Persists a new user                     | Result<(), TradingError> |
// | place_order             | Validates, rests and matches an order   | Result<Order, _>         |
// | cancel_order            | Idempotent cancellation                 | Result<Order, _>         |
// | order_status            | Storage lookup of one order             | Result<Order, _>         |
// | order_book              | Snapshot copy of a symbol's book        | Result<OrderBook, _>     |
// | trades                  | Full trade log                          | Result<Vec<Trade>, _>    |
// | sweep                   | Idempotent matching re-scan, all symbols| Result<Vec<Trade>, _>    |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tracing::info;
use uuid::Uuid;

use crate::domain::models::types::{Order, OrderStatus, Side, Trade, User};
use crate::domain::services::matcher::matcher::{Matcher, MatcherError};
use crate::domain::services::orderbook::orderbook::OrderBook;
use crate::store::{DataStore, StoreError};

/// Caller-facing errors of the trading system.
///
/// The first four variants are expected conditions reported with enough context to correct
/// the input; the operation that detects them performs no partial mutation.
#[derive(Debug, Error)]
pub enum TradingError {
    /// The order's owner is not a registered user.
    #[error("user {0} is not registered")]
    UnknownUser(String),

    /// Order parameters failed validation.
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// No order with this id is known to storage.
    #[error("order {0} not found")]
    OrderNotFound(Uuid),

    /// A user with this id is already registered.
    #[error("user {0} is already registered")]
    DuplicateUser(String),

    /// A violated internal invariant. Fatal to the operation that detected it.
    #[error("internal consistency violation: {0}")]
    InternalConsistency(String),

    /// Storage failure, propagated uninterpreted.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<MatcherError> for TradingError {
    fn from(err: MatcherError) -> Self {
        match err {
            MatcherError::Consistency(msg) => TradingError::InternalConsistency(msg),
            MatcherError::Store(err) => TradingError::Store(err),
        }
    }
}

/// Type alias for Result with TradingError.
pub type TradingResult<T> = Result<T, TradingError>;

/// Orchestrator for user registration, order placement/cancellation and matching.
///
/// Matching is triggered synchronously inside the placement call that caused the cross;
/// there is no background scheduler. [`TradingSystem::sweep`] exists as an idempotent
/// re-scan for books loaded from a snapshot.
pub struct TradingSystem {
    store: Arc<dyn DataStore>,
    matcher: Matcher,
    /// One async mutex per symbol; the registry itself is guarded by a short sync lock.
    symbol_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    /// Serializes the registration check-and-save so two concurrent registrations of the
    /// same id cannot both pass the duplicate check.
    registration_lock: AsyncMutex<()>,
}

impl TradingSystem {
    /// Creates a trading system over the given store.
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            matcher: Matcher::new(store.clone()),
            store,
            symbol_locks: Mutex::new(HashMap::new()),
            registration_lock: AsyncMutex::new(()),
        }
    }

    /// Registers a new user.
    ///
    /// # Errors
    /// `DuplicateUser` if the id is already registered; the existing record is untouched.
    pub async fn register_user(&self, user: User) -> TradingResult<()> {
        let _guard = self.registration_lock.lock().await;
        if self.store.get_user(&user.id).await?.is_some() {
            return Err(TradingError::DuplicateUser(user.id));
        }
        info!("registering user {} ({})", user.id, user.name);
        self.store.save_user(&user).await?;
        Ok(())
    }

    /// Places a limit order and runs a matching pass for its symbol.
    ///
    /// On success the returned order reflects the post-match state: it may already be
    /// partially filled or fully `Executed`.
    ///
    /// # Errors
    /// * `InvalidOrder` on zero quantity or non-positive price
    /// * `UnknownUser` if `user_id` is not registered
    /// * `InternalConsistency` / `Store` from the book or the storage backend
    pub async fn place_order(
        &self,
        user_id: &str,
        side: Side,
        symbol: &str,
        quantity: u64,
        price: Decimal,
    ) -> TradingResult<Order> {
        if quantity == 0 {
            return Err(TradingError::InvalidOrder(
                "quantity must be a positive integer".to_string(),
            ));
        }
        if price <= Decimal::ZERO {
            return Err(TradingError::InvalidOrder(format!(
                "price must be positive, got {price}"
            )));
        }
        if self.store.get_user(user_id).await?.is_none() {
            return Err(TradingError::UnknownUser(user_id.to_string()));
        }

        let lock = self.symbol_lock(symbol);
        let _guard = lock.lock().await;

        let order = Order::new(user_id, side, symbol, quantity, price);
        self.store.save_order(&order).await?;

        let mut book = self.store.get_order_book(symbol).await?;
        book.insert(order.clone())
            .map_err(|err| TradingError::InternalConsistency(err.to_string()))?;
        self.store.save_order_book(&book).await?;
        info!("order placed: {order}");

        self.matcher.match_symbol(symbol).await?;

        self.store.get_order(order.id).await?.ok_or_else(|| {
            TradingError::InternalConsistency(format!("order {} vanished during matching", order.id))
        })
    }

    /// Cancels an order on a symbol.
    ///
    /// A resting order is removed from the book and marked `CANCELED`. An order already in
    /// a terminal state is returned unchanged: the second cancel is a no-op reporting the
    /// existing status, never an error.
    ///
    /// # Errors
    /// `OrderNotFound` if storage has no order with this id, or if the order belongs to a
    /// different symbol than the one named. The symbol check runs before any mutation: a
    /// mismatched cancel must not flag an order `CANCELED` while its live copy keeps
    /// resting in the real symbol's book.
    pub async fn cancel_order(&self, symbol: &str, order_id: Uuid) -> TradingResult<Order> {
        let lock = self.symbol_lock(symbol);
        let _guard = lock.lock().await;

        let mut order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(TradingError::OrderNotFound(order_id))?;
        if order.symbol != symbol {
            return Err(TradingError::OrderNotFound(order_id));
        }

        if order.status != OrderStatus::Accepted {
            return Ok(order);
        }

        let mut book = self.store.get_order_book(symbol).await?;
        // Absent from the book is fine; the cancel stays idempotent either way.
        book.remove(order_id);
        self.store.save_order_book(&book).await?;

        order.cancel();
        self.store.save_order(&order).await?;
        info!("order canceled: {order}");
        Ok(order)
    }

    /// Looks up an order's current state in storage.
    ///
    /// # Errors
    /// `OrderNotFound` if no order with this id exists.
    pub async fn order_status(&self, order_id: Uuid) -> TradingResult<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or(TradingError::OrderNotFound(order_id))
    }

    /// Returns a snapshot copy of a symbol's book. Unknown symbols yield an empty book.
    pub async fn order_book(&self, symbol: &str) -> TradingResult<OrderBook> {
        Ok(self.store.get_order_book(symbol).await?)
    }

    /// Returns the full trade log in execution order.
    pub async fn trades(&self) -> TradingResult<Vec<Trade>> {
        Ok(self.store.get_trades().await?)
    }

    /// Runs one matching pass over every stored symbol and returns the trades emitted.
    ///
    /// Safe to run at any time: each symbol is processed under its lock and a non-crossed
    /// book is a no-op. The binary calls this once at startup to prime matching for books
    /// loaded from a snapshot.
    pub async fn sweep(&self) -> TradingResult<Vec<Trade>> {
        let mut all = Vec::new();
        for symbol in self.store.get_all_symbols().await? {
            let lock = self.symbol_lock(&symbol);
            let _guard = lock.lock().await;
            all.extend(self.matcher.match_symbol(&symbol).await?);
        }
        Ok(all)
    }

    fn symbol_lock(&self, symbol: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.symbol_locks.lock();
        locks.entry(symbol.to_string()).or_default().clone()
    }
}
