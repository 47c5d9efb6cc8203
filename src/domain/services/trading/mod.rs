pub mod trading_system;

pub use trading_system::{TradingError, TradingResult, TradingSystem};
