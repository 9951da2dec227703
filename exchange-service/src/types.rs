//! Request and response bodies for the HTTP API.

use chrono::{DateTime, Utc};
use orderbook::{Level, Order, OrderId, OrderKind, OrderStatus, Side, Trade};
use serde::{Deserialize, Serialize};

use crate::engine::NewOrder;
use crate::error::{ApiError, FieldError};

pub const MAX_SYMBOL_LEN: usize = 20;

/// Request to place a new order. Side and type arrive as plain strings so
/// validation can report every offending field at once instead of failing
/// at the first bad enum.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub side: String,
    #[serde(rename = "type", default)]
    pub order_type: String,
    pub price: Option<i64>,
    #[serde(default)]
    pub quantity: i64,
}

impl PlaceOrderRequest {
    pub fn validate(&self) -> Result<NewOrder, ApiError> {
        let mut fields = Vec::new();

        if self.symbol.is_empty()
            || self.symbol.len() > MAX_SYMBOL_LEN
            || !self.symbol.chars().all(|c| c.is_ascii_alphanumeric())
        {
            fields.push(FieldError::new(
                "symbol",
                "must be 1-20 ASCII alphanumeric characters",
            ));
        }

        let side = Side::parse(&self.side);
        if side.is_none() {
            fields.push(FieldError::new("side", "must be \"buy\" or \"sell\""));
        }

        let kind = match self.order_type.as_str() {
            "limit" => match self.price {
                Some(price) if price > 0 => Some(OrderKind::Limit { price }),
                Some(_) => {
                    fields.push(FieldError::new("price", "must be positive"));
                    None
                }
                None => {
                    fields.push(FieldError::new("price", "required for limit orders"));
                    None
                }
            },
            "market" => {
                if self.price.is_some() {
                    fields.push(FieldError::new("price", "must be omitted for market orders"));
                }
                Some(OrderKind::Market)
            }
            _ => {
                fields.push(FieldError::new("type", "must be \"limit\" or \"market\""));
                None
            }
        };

        if self.quantity <= 0 {
            fields.push(FieldError::new("quantity", "must be positive"));
        }

        match (side, kind) {
            (Some(side), Some(kind)) if fields.is_empty() => Ok(NewOrder {
                symbol: self.symbol.clone(),
                side,
                kind,
                quantity: self.quantity,
            }),
            _ => Err(ApiError::Validation(fields)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    pub message: &'static str,
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub trades: Vec<Trade>,
}

/// An order as the API reports it: the tagged pricing variant flattens back
/// into a `type` plus optional `price`.
#[derive(Debug, Serialize)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub symbol: String,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    pub quantity: i64,
    pub remaining: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderRecord {
    fn from(order: Order) -> OrderRecord {
        OrderRecord {
            order_id: order.id,
            order_type: order.kind.as_str(),
            price: order.kind.price(),
            symbol: order.symbol,
            side: order.side,
            quantity: order.quantity,
            remaining: order.remaining,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GetOrderResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub order: OrderRecord,
}

#[derive(Debug, Serialize)]
pub struct CancelOrderResponse {
    pub message: &'static str,
    pub order_id: OrderId,
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
pub struct OrderBookResponse {
    pub message: &'static str,
    pub symbol: String,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
}

#[derive(Debug, Serialize)]
pub struct TradesResponse {
    pub message: &'static str,
    pub symbol: String,
    pub trades: Vec<Trade>,
}

/// Query parameters for the orderbook and trades endpoints.
#[derive(Debug, Deserialize)]
pub struct SymbolQuery {
    pub symbol: Option<String>,
}

impl SymbolQuery {
    pub fn require(self) -> Result<String, ApiError> {
        match self.symbol {
            Some(symbol) if !symbol.is_empty() => Ok(symbol),
            _ => Err(ApiError::Validation(vec![FieldError::new(
                "symbol",
                "query parameter is required",
            )])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(symbol: &str, side: &str, order_type: &str, price: Option<i64>, quantity: i64) -> PlaceOrderRequest {
        PlaceOrderRequest {
            symbol: symbol.to_string(),
            side: side.to_string(),
            order_type: order_type.to_string(),
            price,
            quantity,
        }
    }

    fn offending_fields(err: ApiError) -> Vec<&'static str> {
        match err {
            ApiError::Validation(fields) => fields.into_iter().map(|f| f.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_limit_order_passes() {
        let new_order = request("ACME", "buy", "limit", Some(100), 10).validate().unwrap();
        assert_eq!(new_order.side, Side::Buy);
        assert_eq!(new_order.kind, OrderKind::Limit { price: 100 });
        assert_eq!(new_order.quantity, 10);
    }

    #[test]
    fn valid_market_order_passes() {
        let new_order = request("ACME", "sell", "market", None, 3).validate().unwrap();
        assert_eq!(new_order.kind, OrderKind::Market);
    }

    #[test]
    fn limit_without_price_is_rejected() {
        let err = request("ACME", "buy", "limit", None, 10).validate().unwrap_err();
        assert_eq!(offending_fields(err), vec!["price"]);
    }

    #[test]
    fn market_with_price_is_rejected() {
        let err = request("ACME", "buy", "market", Some(100), 10).validate().unwrap_err();
        assert_eq!(offending_fields(err), vec!["price"]);
    }

    #[test]
    fn every_offending_field_is_reported() {
        let err = request("", "hold", "stop", None, 0).validate().unwrap_err();
        assert_eq!(offending_fields(err), vec!["symbol", "side", "type", "quantity"]);
    }

    #[test]
    fn non_positive_values_are_rejected() {
        let err = request("ACME", "buy", "limit", Some(0), 10).validate().unwrap_err();
        assert_eq!(offending_fields(err), vec!["price"]);

        let err = request("ACME", "buy", "limit", Some(100), -1).validate().unwrap_err();
        assert_eq!(offending_fields(err), vec!["quantity"]);
    }

    #[test]
    fn symbol_format_is_enforced() {
        let err = request("AC ME", "buy", "limit", Some(100), 10).validate().unwrap_err();
        assert_eq!(offending_fields(err), vec!["symbol"]);

        let long = "A".repeat(MAX_SYMBOL_LEN + 1);
        let err = request(&long, "buy", "limit", Some(100), 10).validate().unwrap_err();
        assert_eq!(offending_fields(err), vec!["symbol"]);
    }

    #[test]
    fn symbol_query_requires_a_value() {
        assert!(SymbolQuery { symbol: None }.require().is_err());
        assert!(SymbolQuery { symbol: Some(String::new()) }.require().is_err());
        assert_eq!(
            SymbolQuery { symbol: Some("ACME".to_string()) }.require().unwrap(),
            "ACME"
        );
    }
}
