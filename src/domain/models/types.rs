//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module defines the core data types used throughout the trading core: orders, trades,
// users, and their status/side enums.
//
// | Section            | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | ENUMS              | Defines discrete sets of values (Side, OrderStatus).             |
// | STRUCTS            | Defines the structure of Orders, Trades and Users.               |
// | Potential Errors   | Defines errors related to type handling.                         |
// | TESTS              | Contains unit tests for the defined types.                       |
//--------------------------------------------------------------------------------------------------

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

//--------------------------------------------------------------------------------------------------
//  ENUMS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                  |
// |---------------|----------------------------------------------|
// | Side          | Represents the side of an order (Buy/Sell).  |
// | OrderStatus   | Represents the lifecycle status of an order. |
//--------------------------------------------------------------------------------------------------

/// Represents the side of an order (Buy or Sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// A buy order.
    Buy,
    /// A sell order.
    Sell,
}

impl Side {
    /// Returns the opposite side of the book.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for Side {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(TypeError::InvalidSide(other.to_string())),
        }
    }
}

/// Represents the lifecycle status of an order.
///
/// The transition graph is monotonic: `Accepted` is the only non-terminal state,
/// and an order that reaches `Executed` or `Canceled` never leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// The order has been accepted and is (or was) eligible to rest in the book.
    Accepted,
    /// The order's quantity was fully consumed by one or more trades.
    Executed,
    /// The order was cancelled before being fully filled.
    Canceled,
}

impl OrderStatus {
    /// Returns true once the order can no longer change state.
    pub fn is_terminal(self) -> bool {
        !matches!(self, OrderStatus::Accepted)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Accepted => write!(f, "ACCEPTED"),
            OrderStatus::Executed => write!(f, "EXECUTED"),
            OrderStatus::Canceled => write!(f, "CANCELED"),
        }
    }
}

//--------------------------------------------------------------------------------------------------
//  STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                   |
// |---------------|-----------------------------------------------|
// | Order         | Represents a limit order in the system.       |
// | Trade         | Represents a completed match between orders.  |
// | User          | Reference target for order ownership.         |
//--------------------------------------------------------------------------------------------------

/// Represents a plain limit order.
///
/// `quantity` is the *remaining* quantity: it is decremented on every partial fill and
/// reaching zero implies the `Executed` status. `created_at` is immutable and used only
/// for time-priority tie-breaks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier for the order, generated at creation.
    pub id: Uuid,
    /// Identifier of the user that owns the order.
    pub user_id: String,
    /// Side of the order (Buy or Sell).
    pub side: Side,
    /// Symbol the order trades.
    pub symbol: String,
    /// Remaining quantity available to trade.
    pub quantity: u64,
    /// Limit price. Stored as Decimal to avoid floating-point drift.
    pub price: Decimal,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Timestamp of order creation (time-priority tie-break).
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order in the `Accepted` state with a fresh id and timestamp.
    pub fn new(
        user_id: impl Into<String>,
        side: Side,
        symbol: impl Into<String>,
        quantity: u64,
        price: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            side,
            symbol: symbol.into(),
            quantity,
            price,
            status: OrderStatus::Accepted,
            created_at: Utc::now(),
        }
    }

    /// Returns true while the order is eligible to rest in a book.
    pub fn is_resting(&self) -> bool {
        self.status == OrderStatus::Accepted && self.quantity > 0
    }

    /// Consumes `quantity` units of the remaining quantity.
    ///
    /// Reaching zero transitions the order to `Executed`. A zero fill or a fill larger
    /// than the remaining quantity is an internal-consistency violation and is rejected
    /// without mutating the order.
    pub fn fill(&mut self, quantity: u64) -> Result<(), TypeError> {
        if quantity == 0 || quantity > self.quantity {
            return Err(TypeError::InvalidFill {
                id: self.id,
                fill: quantity,
                remaining: self.quantity,
            });
        }
        self.quantity -= quantity;
        if self.quantity == 0 {
            self.status = OrderStatus::Executed;
        }
        Ok(())
    }

    /// Marks the order as cancelled.
    pub fn cancel(&mut self) {
        self.status = OrderStatus::Canceled;
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} x{} @ {} [{}] (user {})",
            self.id, self.side, self.symbol, self.quantity, self.price, self.status, self.user_id
        )
    }
}

/// Represents a completed trade between a buy and a sell order.
///
/// Trades are append-only and never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique identifier for the trade.
    pub id: Uuid,
    /// ID of the buy-side order.
    pub buy_order_id: Uuid,
    /// ID of the sell-side order.
    pub sell_order_id: Uuid,
    /// Symbol the trade occurred on.
    pub symbol: String,
    /// Quantity traded.
    pub quantity: u64,
    /// Execution price (the sell order's limit price by convention).
    pub price: Decimal,
    /// Timestamp when the trade occurred.
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    /// Creates a new trade record with a fresh id and timestamp.
    pub fn new(
        buy_order_id: Uuid,
        sell_order_id: Uuid,
        symbol: impl Into<String>,
        quantity: u64,
        price: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            buy_order_id,
            sell_order_id,
            symbol: symbol.into(),
            quantity,
            price,
            executed_at: Utc::now(),
        }
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} x{} @ {} (buy {} / sell {})",
            self.id, self.symbol, self.quantity, self.price, self.buy_order_id, self.sell_order_id
        )
    }
}

/// A registered user. Only referenced for order ownership; not part of matching itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Caller-chosen unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Optional phone contact.
    #[serde(default)]
    pub phone: Option<String>,
    /// Optional email contact.
    #[serde(default)]
    pub email: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phone: None,
            email: None,
        }
    }
}

//--------------------------------------------------------------------------------------------------
//  Potential Errors
//--------------------------------------------------------------------------------------------------
/// Represents errors that can occur during type validation or mutation within this module.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// Occurs when attempting to create a `Side` from an unrecognized string.
    #[error("Invalid side specified: {0}")]
    InvalidSide(String),
    /// Occurs when a fill is zero or exceeds the remaining quantity of an order.
    #[error("Invalid fill of {fill} for order {id} with remaining quantity {remaining}")]
    InvalidFill { id: Uuid, fill: u64, remaining: u64 },
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                          | Description                                      |
// |-------------------------------|--------------------------------------------------|
// | test_order_creation           | Verify basic Order construction.                 |
// | test_partial_and_full_fill    | Fill transitions down to Executed.               |
// | test_invalid_fill             | Zero and oversized fills are rejected.           |
// | test_cancel                   | Cancel transitions to Canceled.                  |
// | test_side_parsing             | Side round-trips from strings.                   |
// | test_trade_creation           | Verify basic Trade construction.                 |
// | test_status_serialization     | Wire format of statuses and sides.               |
//--------------------------------------------------------------------------------------------------
