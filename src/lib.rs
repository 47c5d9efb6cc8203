// Expose the modules
pub mod config;
pub mod domain;
pub mod store;

// Re-export key types for easier usage
pub use domain::models::types::{Order, OrderStatus, Side, Trade, TypeError, User};
pub use domain::services::matcher::matcher::{MatchResult, Matcher, MatcherError};
pub use domain::services::orderbook::orderbook::{OrderBook, OrderBookError};
pub use domain::services::trading::trading_system::{TradingError, TradingResult, TradingSystem};
pub use store::memory::InMemoryStore;
pub use store::{DataStore, StoreError};
