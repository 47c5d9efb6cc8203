pub mod matcher;
pub mod orderbook;
pub mod trading;
