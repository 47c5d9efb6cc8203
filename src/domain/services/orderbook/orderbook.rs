//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements a limit order book for a single symbol. It maintains buy and sell
// orders in price-time priority: buys best-price-descending, sells best-price-ascending,
// FIFO by creation timestamp within a price level.
//
// | Component     | Description                                                               |
// |---------------|---------------------------------------------------------------------------|
// | OrderBook     | Main order book structure managing the two sides                          |
// | Price levels  | BTreeMap keyed by price, FIFO queue of orders per level                   |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                                | Return Type              |
// |-----------------------|--------------------------------------------|--------------------------|
// | new                   | Creates a new empty book for a symbol      | OrderBook                |
// | insert                | Adds a resting order                       | Result<(), OrderBookError> |
// | remove                | Removes an order by id (idempotent)        | Option<Order>            |
// | peek_best             | Best order of a side without removing      | Option<&Order>           |
// | fill_best             | Decrements the best order of a side        | Result<Order, OrderBookError> |
// | best_bid / best_ask   | Best prices                                | Option<Decimal>          |
// | is_crossed            | Best bid >= best ask                       | bool                     |
//--------------------------------------------------------------------------------------------------

use std::collections::{BTreeMap, VecDeque};

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::types::{Order, Side, TypeError};

/// A per-symbol book of resting orders.
///
/// The book owns its orders by value; there are no shared mutable handles between the book
/// and the matching pass. Every quantity mutation goes through [`OrderBook::fill_best`],
/// which returns the updated order so the caller can persist it.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    /// Symbol this book manages.
    symbol: String,
    /// Buy side, keyed by price. Best bid is the *highest* key.
    bids: BTreeMap<Decimal, VecDeque<Order>>,
    /// Sell side, keyed by price. Best ask is the *lowest* key.
    asks: BTreeMap<Decimal, VecDeque<Order>>,
}

impl OrderBook {
    /// Creates a new empty order book for a symbol.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
        }
    }

    /// Returns the symbol this book manages.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Adds a resting order to the side matching `order.side`.
    ///
    /// Orders are positioned by price level and, within a level, by creation timestamp so
    /// that books rebuilt from a snapshot keep time priority regardless of load order.
    ///
    /// # Errors
    /// * `WrongSymbol` if the order is for a different symbol
    /// * `NotResting` if the order is not `Accepted` with positive quantity
    /// * `DuplicateOrder` if an order with the same id is already in the book
    pub fn insert(&mut self, order: Order) -> Result<(), OrderBookError> {
        if order.symbol != self.symbol {
            return Err(OrderBookError::WrongSymbol {
                expected: self.symbol.clone(),
                got: order.symbol,
            });
        }
        if !order.is_resting() {
            return Err(OrderBookError::NotResting(order.id));
        }
        if self.contains(order.id) {
            return Err(OrderBookError::DuplicateOrder(order.id));
        }

        let level = self.side_mut(order.side).entry(order.price).or_default();
        let pos = level
            .iter()
            .rposition(|o| o.created_at <= order.created_at)
            .map_or(0, |i| i + 1);
        level.insert(pos, order);
        Ok(())
    }

    /// Removes the order with the given id from whichever side holds it.
    ///
    /// Returns `None` without error if the order is not in the book, so cancellation
    /// stays idempotent.
    pub fn remove(&mut self, order_id: Uuid) -> Option<Order> {
        for side in [&mut self.bids, &mut self.asks] {
            let found = side.iter().find_map(|(price, level)| {
                level
                    .iter()
                    .position(|o| o.id == order_id)
                    .map(|idx| (*price, idx))
            });
            if let Some((price, idx)) = found {
                let level = side.get_mut(&price)?;
                let order = level.remove(idx)?;
                if level.is_empty() {
                    side.remove(&price);
                }
                return Some(order);
            }
        }
        None
    }

    /// Returns the highest-priority resting order for a side without removing it.
    pub fn peek_best(&self, side: Side) -> Option<&Order> {
        match side {
            Side::Buy => self.bids.values().next_back()?.front(),
            Side::Sell => self.asks.values().next()?.front(),
        }
    }

    /// Decrements the best order of a side by `quantity` and returns the updated order.
    ///
    /// When the fill consumes the whole remaining quantity the order transitions to
    /// `Executed`, is popped from its queue, and its price level is dropped if emptied.
    ///
    /// # Errors
    /// * `EmptySide` if the side has no orders
    /// * `Fill` if the fill is zero or exceeds the best order's remaining quantity
    pub fn fill_best(&mut self, side: Side, quantity: u64) -> Result<Order, OrderBookError> {
        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let price = match side {
            Side::Buy => levels.keys().next_back().copied(),
            Side::Sell => levels.keys().next().copied(),
        }
        .ok_or(OrderBookError::EmptySide(side))?;

        let level = levels.get_mut(&price).ok_or(OrderBookError::EmptySide(side))?;
        let front = level.front_mut().ok_or(OrderBookError::EmptySide(side))?;
        front.fill(quantity)?;
        let updated = front.clone();

        if updated.quantity == 0 {
            level.pop_front();
            if level.is_empty() {
                levels.remove(&price);
            }
        }
        Ok(updated)
    }

    /// Returns the highest bid price, if any.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next_back().copied()
    }

    /// Returns the lowest ask price, if any.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    /// True iff both sides are non-empty and the best bid price is at or above the
    /// best ask price.
    pub fn is_crossed(&self) -> bool {
        matches!(
            (self.best_bid(), self.best_ask()),
            (Some(bid), Some(ask)) if bid >= ask
        )
    }

    /// True if the book holds an order with the given id on either side.
    pub fn contains(&self, order_id: Uuid) -> bool {
        self.iter_side(Side::Buy)
            .chain(self.iter_side(Side::Sell))
            .any(|o| o.id == order_id)
    }

    /// Iterates a side's orders in matching priority order (best price first, FIFO within
    /// a price level).
    pub fn iter_side(&self, side: Side) -> Box<dyn Iterator<Item = &Order> + '_> {
        match side {
            Side::Buy => Box::new(self.bids.values().rev().flat_map(|level| level.iter())),
            Side::Sell => Box::new(self.asks.values().flat_map(|level| level.iter())),
        }
    }

    /// Total number of resting orders across both sides.
    pub fn len(&self) -> usize {
        self.bids.values().map(VecDeque::len).sum::<usize>()
            + self.asks.values().map(VecDeque::len).sum::<usize>()
    }

    /// True if neither side holds any orders.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<Decimal, VecDeque<Order>> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }
}

/// Errors that can occur during order book operations.
///
/// When surfaced through a matching pass these all indicate a violated internal invariant.
#[derive(Debug, Error)]
pub enum OrderBookError {
    /// Order is for a different symbol than this book.
    #[error("Order is for wrong symbol (expected {expected}, got {got})")]
    WrongSymbol { expected: String, got: String },

    /// Only accepted orders with positive quantity may rest in the book.
    #[error("Order {0} is not resting (wrong status or zero quantity)")]
    NotResting(Uuid),

    /// An order may appear on at most one side of at most one book.
    #[error("Order {0} is already in the book")]
    DuplicateOrder(Uuid),

    /// The requested side has no orders.
    #[error("No orders on the {0} side")]
    EmptySide(Side),

    /// A fill violated an order's quantity invariant.
    #[error(transparent)]
    Fill(#[from] TypeError),
}

#[cfg(test)]
mod tests {
    //--------------------------------------------------------------------------------------------------
    // TEST MODULE OVERVIEW
    //--------------------------------------------------------------------------------------------------
    // Tests are organized into categories:
    //
    // 1. Basic Functionality
    //    - Empty book state
    //    - Insert / peek / remove
    //
    // 2. Ordering
    //    - Price priority across levels
    //    - FIFO within a level
    //
    // 3. Matching support
    //    - Crossed detection
    //    - fill_best partial and full fills
    //
    // 4. Edge Cases
    //    - Wrong symbol, duplicate ids, non-resting orders
    //--------------------------------------------------------------------------------------------------

    use super::*;
    use crate::domain::models::types::OrderStatus;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn order(side: Side, qty: u64, price: Decimal) -> Order {
        Order::new("u1", side, "ABC", qty, price)
    }

    #[test]
    fn test_empty_book() {
        let book = OrderBook::new("ABC");
        assert!(book.is_empty());
        assert_eq!(book.len(), 0);
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
        assert!(!book.is_crossed());
        assert!(book.peek_best(Side::Buy).is_none());
        assert!(book.peek_best(Side::Sell).is_none());
    }

    #[test]
    fn test_insert_and_peek() {
        let mut book = OrderBook::new("ABC");
        let buy = order(Side::Buy, 10, dec!(100));
        let sell = order(Side::Sell, 5, dec!(105));
        book.insert(buy.clone()).unwrap();
        book.insert(sell.clone()).unwrap();

        assert_eq!(book.len(), 2);
        assert_eq!(book.best_bid(), Some(dec!(100)));
        assert_eq!(book.best_ask(), Some(dec!(105)));
        assert_eq!(book.peek_best(Side::Buy).unwrap().id, buy.id);
        assert_eq!(book.peek_best(Side::Sell).unwrap().id, sell.id);
        assert!(!book.is_crossed());
    }

    #[test]
    fn test_price_priority() {
        let mut book = OrderBook::new("ABC");
        book.insert(order(Side::Buy, 1, dec!(99))).unwrap();
        let best_buy = order(Side::Buy, 1, dec!(101));
        book.insert(best_buy.clone()).unwrap();
        book.insert(order(Side::Buy, 1, dec!(100))).unwrap();

        book.insert(order(Side::Sell, 1, dec!(110))).unwrap();
        let best_sell = order(Side::Sell, 1, dec!(108));
        book.insert(best_sell.clone()).unwrap();

        assert_eq!(book.peek_best(Side::Buy).unwrap().id, best_buy.id);
        assert_eq!(book.peek_best(Side::Sell).unwrap().id, best_sell.id);

        let bid_prices: Vec<Decimal> = book.iter_side(Side::Buy).map(|o| o.price).collect();
        assert_eq!(bid_prices, vec![dec!(101), dec!(100), dec!(99)]);
        let ask_prices: Vec<Decimal> = book.iter_side(Side::Sell).map(|o| o.price).collect();
        assert_eq!(ask_prices, vec![dec!(108), dec!(110)]);
    }

    #[test]
    fn test_time_priority_within_level() {
        let mut book = OrderBook::new("ABC");
        let first = order(Side::Buy, 1, dec!(100));
        let mut second = order(Side::Buy, 1, dec!(100));
        second.created_at = first.created_at + Duration::milliseconds(5);

        // Insert out of arrival order; the book must still put `first` ahead.
        book.insert(second.clone()).unwrap();
        book.insert(first.clone()).unwrap();

        let ids: Vec<Uuid> = book.iter_side(Side::Buy).map(|o| o.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert_eq!(book.peek_best(Side::Buy).unwrap().id, first.id);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut book = OrderBook::new("ABC");
        let buy = order(Side::Buy, 10, dec!(100));
        book.insert(buy.clone()).unwrap();

        let removed = book.remove(buy.id).unwrap();
        assert_eq!(removed.id, buy.id);
        assert!(book.is_empty());

        // Second removal is a no-op, not an error.
        assert!(book.remove(buy.id).is_none());
    }

    #[test]
    fn test_crossed_detection() {
        let mut book = OrderBook::new("ABC");
        book.insert(order(Side::Buy, 1, dec!(100))).unwrap();
        assert!(!book.is_crossed());

        book.insert(order(Side::Sell, 1, dec!(100))).unwrap();
        assert!(book.is_crossed());

        let mut book = OrderBook::new("ABC");
        book.insert(order(Side::Buy, 1, dec!(100))).unwrap();
        book.insert(order(Side::Sell, 1, dec!(95))).unwrap();
        assert!(book.is_crossed());
    }

    #[test]
    fn test_fill_best_partial_and_full() {
        let mut book = OrderBook::new("ABC");
        let buy = order(Side::Buy, 10, dec!(100));
        book.insert(buy.clone()).unwrap();

        let updated = book.fill_best(Side::Buy, 4).unwrap();
        assert_eq!(updated.id, buy.id);
        assert_eq!(updated.quantity, 6);
        assert_eq!(updated.status, OrderStatus::Accepted);
        assert_eq!(book.peek_best(Side::Buy).unwrap().quantity, 6);

        let updated = book.fill_best(Side::Buy, 6).unwrap();
        assert_eq!(updated.quantity, 0);
        assert_eq!(updated.status, OrderStatus::Executed);
        // Executed orders leave the book and the emptied level is dropped.
        assert!(book.is_empty());
    }

    #[test]
    fn test_fill_best_errors() {
        let mut book = OrderBook::new("ABC");
        assert!(matches!(
            book.fill_best(Side::Sell, 1),
            Err(OrderBookError::EmptySide(Side::Sell))
        ));

        book.insert(order(Side::Sell, 3, dec!(95))).unwrap();
        assert!(matches!(
            book.fill_best(Side::Sell, 4),
            Err(OrderBookError::Fill(_))
        ));
        // The failed fill left the book untouched.
        assert_eq!(book.peek_best(Side::Sell).unwrap().quantity, 3);
    }

    #[test]
    fn test_insert_rejections() {
        let mut book = OrderBook::new("ABC");

        let wrong = Order::new("u1", Side::Buy, "XYZ", 1, dec!(10));
        assert!(matches!(
            book.insert(wrong),
            Err(OrderBookError::WrongSymbol { .. })
        ));

        let mut canceled = order(Side::Buy, 1, dec!(10));
        canceled.cancel();
        assert!(matches!(
            book.insert(canceled),
            Err(OrderBookError::NotResting(_))
        ));

        let dup = order(Side::Buy, 1, dec!(10));
        book.insert(dup.clone()).unwrap();
        assert!(matches!(
            book.insert(dup),
            Err(OrderBookError::DuplicateOrder(_))
        ));
    }
}
