//! Core domain types for the matching engine.
//!
//! Prices are integer ticks and quantities are integer lots throughout, so
//! equality is exact and price-level aggregation is well-defined. Timestamps
//! carry time priority; ids are assigned by the store on insert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order side - buy (bid) or sell (ask).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side an incoming order matches against.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }

    pub fn parse(s: &str) -> Option<Side> {
        match s {
            "buy" => Some(Side::Buy),
            "sell" => Some(Side::Sell),
            _ => None,
        }
    }
}

/// Pricing of an order.
///
/// Limit orders always carry a price; market orders never do. The nullable
/// price column exists only at the storage and HTTP boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderKind {
    Limit { price: i64 },
    Market,
}

impl OrderKind {
    pub fn price(self) -> Option<i64> {
        match self {
            OrderKind::Limit { price } => Some(price),
            OrderKind::Market => None,
        }
    }

    pub fn is_market(self) -> bool {
        matches!(self, OrderKind::Market)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderKind::Limit { .. } => "limit",
            OrderKind::Market => "market",
        }
    }
}

/// Lifecycle status of an order.
///
/// Transitions: `Open -> Partial -> Filled`, with `Cancelled` reachable from
/// `Open` and `Partial`. `Filled` and `Cancelled` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Partial,
    Filled,
    Cancelled,
}

impl OrderStatus {
    /// Status implied by fill progress. Every mutator derives status through
    /// here so `remaining` and status cannot drift apart.
    pub fn from_progress(quantity: i64, remaining: i64) -> OrderStatus {
        if remaining == 0 {
            OrderStatus::Filled
        } else if remaining < quantity {
            OrderStatus::Partial
        } else {
            OrderStatus::Open
        }
    }

    /// Terminal orders cannot be cancelled or matched.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::Partial => "partial",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "open" => Some(OrderStatus::Open),
            "partial" => Some(OrderStatus::Partial),
            "filled" => Some(OrderStatus::Filled),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// Unique order identifier, assigned by the store on insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub i64);

/// Unique trade identifier, assigned by the store on insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradeId(pub i64);

/// Full order record.
#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub side: Side,
    pub kind: OrderKind,
    pub quantity: i64,
    pub remaining: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn price(&self) -> Option<i64> {
        self.kind.price()
    }
}

/// Trade execution record. Append-only, never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    #[serde(rename = "trade_id")]
    pub id: TradeId,
    pub symbol: String,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub price: i64,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

/// A resting limit order as the book sees it.
///
/// The book only needs identity, price, open quantity, and arrival time; the
/// full record lives in the store.
#[derive(Clone, Debug, PartialEq)]
pub struct RestingOrder {
    pub id: OrderId,
    pub price: i64,
    pub remaining: i64,
    pub created_at: DateTime<Utc>,
}

/// An aggregate of resting quantity at one price on one side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub price: i64,
    pub quantity: i64,
    pub orders: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_fill_progress() {
        assert_eq!(OrderStatus::from_progress(10, 10), OrderStatus::Open);
        assert_eq!(OrderStatus::from_progress(10, 4), OrderStatus::Partial);
        assert_eq!(OrderStatus::from_progress(10, 0), OrderStatus::Filled);
    }

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Open.is_terminal());
        assert!(!OrderStatus::Partial.is_terminal());
    }

    #[test]
    fn side_round_trips_through_strings() {
        for side in [Side::Buy, Side::Sell] {
            assert_eq!(Side::parse(side.as_str()), Some(side));
        }
        assert_eq!(Side::parse("hold"), None);
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn kind_price_only_for_limits() {
        assert_eq!(OrderKind::Limit { price: 100 }.price(), Some(100));
        assert_eq!(OrderKind::Market.price(), None);
        assert!(OrderKind::Market.is_market());
    }
}
