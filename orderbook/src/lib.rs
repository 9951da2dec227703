//! Limit order book with price-time priority matching.
//!
//! Core pieces:
//! - Price-time priority book (best price first, then FIFO)
//! - Pure matcher producing fills that are applied only after persistence
//! - Partial fills, market sweeps, and O(log n) cancellation by id

pub mod matcher;
pub mod price_levels;
pub mod types;

pub use matcher::{Fill, MatchOutcome};
pub use price_levels::PriceLevels;
pub use types::{
    Level, Order, OrderId, OrderKind, OrderStatus, RestingOrder, Side, Trade, TradeId,
};

/// Central limit order book for one symbol, with separate bid/ask sides.
///
/// Holds resting limit orders only; market orders never rest. Not
/// thread-safe - wrap in a lock for concurrent access.
pub struct OrderBook {
    /// Buy orders, highest price first
    pub bids: PriceLevels,
    /// Sell orders, lowest price first
    pub asks: PriceLevels,
}

impl OrderBook {
    /// Creates an empty order book.
    pub fn new() -> Self {
        Self {
            bids: PriceLevels::new(Side::Buy),
            asks: PriceLevels::new(Side::Sell),
        }
    }

    pub fn side(&self, side: Side) -> &PriceLevels {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut PriceLevels {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Inserts a resting limit order at its price-time position.
    pub fn add(&mut self, side: Side, order: RestingOrder) {
        self.side_mut(side).push(order);
    }

    /// Removes a resting order by id from whichever side it lives on.
    /// Returns whether a removal occurred.
    pub fn remove(&mut self, id: OrderId) -> bool {
        self.bids.remove(id) || self.asks.remove(id)
    }

    /// Returns the current best bid price (highest buy price).
    pub fn best_bid(&self) -> Option<i64> {
        self.bids.best_price()
    }

    /// Returns the current best ask price (lowest sell price).
    pub fn best_ask(&self) -> Option<i64> {
        self.asks.best_price()
    }

    /// Aggregated levels on both sides, best first. Only resting orders
    /// contribute; market orders never rest, so none appear here.
    pub fn snapshot(&self) -> (Vec<Level>, Vec<Level>) {
        (self.bids.levels_best_first(), self.asks.levels_best_first())
    }

    /// Commits a match outcome: consumes the filled makers from the opposite
    /// side and rests the taker's remainder when the outcome says it rests.
    ///
    /// Called after the outcome has been made durable, which is what lets a
    /// failed submission leave the book exactly as it was.
    pub fn apply(&mut self, taker: &Order, outcome: &MatchOutcome) {
        let opposite = self.side_mut(taker.side.opposite());
        for fill in &outcome.fills {
            let applied = opposite.fill_best(fill.maker_id, fill.quantity);
            debug_assert!(applied, "fill did not line up with the book head");
        }
        if outcome.rests {
            if let OrderKind::Limit { price } = taker.kind {
                self.add(
                    taker.side,
                    RestingOrder {
                        id: taker.id,
                        price,
                        remaining: outcome.taker_remaining,
                        created_at: taker.created_at,
                    },
                );
            }
        }
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn resting(id: i64, price: i64, remaining: i64, ts: i64) -> RestingOrder {
        RestingOrder {
            id: OrderId(id),
            price,
            remaining,
            created_at: Utc.timestamp_opt(1_700_000_000 + ts, 0).unwrap(),
        }
    }

    #[test]
    fn add_and_remove_across_sides() {
        let mut book = OrderBook::new();
        book.add(Side::Buy, resting(1, 100, 10, 1));
        book.add(Side::Sell, resting(2, 105, 5, 2));

        assert_eq!(book.best_bid(), Some(100));
        assert_eq!(book.best_ask(), Some(105));

        // remove finds the order without knowing its side
        assert!(book.remove(OrderId(2)));
        assert_eq!(book.best_ask(), None);
        assert!(!book.remove(OrderId(2)));
    }

    #[test]
    fn snapshot_orders_levels_best_first() {
        let mut book = OrderBook::new();
        book.add(Side::Buy, resting(1, 99, 10, 1));
        book.add(Side::Buy, resting(2, 100, 5, 2));
        book.add(Side::Sell, resting(3, 101, 3, 3));
        book.add(Side::Sell, resting(4, 102, 8, 4));

        let (bids, asks) = book.snapshot();
        assert_eq!(
            bids,
            vec![
                Level { price: 100, quantity: 5, orders: 1 },
                Level { price: 99, quantity: 10, orders: 1 },
            ]
        );
        assert_eq!(
            asks,
            vec![
                Level { price: 101, quantity: 3, orders: 1 },
                Level { price: 102, quantity: 8, orders: 1 },
            ]
        );
    }

    #[test]
    fn place_then_cancel_restores_the_book() {
        let mut book = OrderBook::new();
        book.add(Side::Buy, resting(7, 100, 10, 1));
        let before = book.snapshot();

        book.add(Side::Buy, resting(8, 101, 4, 2));
        assert!(book.remove(OrderId(8)));

        assert_eq!(book.snapshot(), before);
    }
}
