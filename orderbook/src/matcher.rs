//! Price-time priority matching.
//!
//! [`execute`] is pure: it computes the full set of fills for an incoming
//! order against a book without mutating either. The caller persists the
//! outcome first and commits it to the book with [`OrderBook::apply`]
//! afterwards, so a failed persistence round-trip leaves the book untouched.

use crate::types::{Order, OrderId, OrderKind, OrderStatus, Side};
use crate::OrderBook;

/// A single execution against a resting order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fill {
    pub maker_id: OrderId,
    /// Trade price: always the resting order's price.
    pub price: i64,
    pub quantity: i64,
    /// The maker's open quantity once this fill is committed.
    pub maker_remaining: i64,
}

impl Fill {
    /// Maker status once this fill is committed. A touched maker with open
    /// quantity left is by definition partially filled.
    pub fn maker_status(&self) -> OrderStatus {
        if self.maker_remaining == 0 {
            OrderStatus::Filled
        } else {
            OrderStatus::Partial
        }
    }
}

/// Everything a matching pass decides about an incoming order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Fills in execution order, best price first.
    pub fills: Vec<Fill>,
    pub taker_remaining: i64,
    pub taker_status: OrderStatus,
    /// Whether the taker's remainder rests in the book. Never true for
    /// market orders.
    pub rests: bool,
}

/// Matches an incoming order against the opposite side of the book.
///
/// Walks resting orders best price first, FIFO within a level. Limit orders
/// cross while the price test holds; market orders cross against anything
/// resting. Trades execute at the resting order's price.
pub fn execute(book: &OrderBook, taker: &Order) -> MatchOutcome {
    let mut remaining = taker.remaining;
    let mut fills = Vec::new();

    for maker in book.side(taker.side.opposite()).iter_best_first() {
        if remaining == 0 {
            break;
        }
        let crosses = match taker.kind {
            OrderKind::Market => true,
            OrderKind::Limit { price } => match taker.side {
                Side::Buy => price >= maker.price,
                Side::Sell => price <= maker.price,
            },
        };
        if !crosses {
            break;
        }
        let quantity = remaining.min(maker.remaining);
        if quantity <= 0 {
            continue;
        }
        remaining -= quantity;
        fills.push(Fill {
            maker_id: maker.id,
            price: maker.price,
            quantity,
            maker_remaining: maker.remaining - quantity,
        });
    }

    let (taker_status, rests) = if remaining == 0 {
        (OrderStatus::Filled, false)
    } else {
        match taker.kind {
            OrderKind::Limit { .. } => (OrderStatus::from_progress(taker.quantity, remaining), true),
            // A market remainder never rests: partial when anything filled,
            // cancelled outright when nothing did.
            OrderKind::Market if remaining < taker.quantity => (OrderStatus::Partial, false),
            OrderKind::Market => (OrderStatus::Cancelled, false),
        }
    };

    MatchOutcome {
        fills,
        taker_remaining: remaining,
        taker_status,
        rests,
    }
}
