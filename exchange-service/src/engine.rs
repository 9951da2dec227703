//! Symbol router: one book per symbol, operations on a symbol serialised.
//!
//! The `DashMap` gives lock-free access to the symbol registry so different
//! symbols match in parallel; each book carries its own `RwLock`. Placement
//! and cancellation hold the write lock across the database round-trips -
//! releasing it mid-match would admit phantom crossings. Book mutations are
//! applied only after the transaction commits, so a rollback never has to
//! undo in-memory state.

use chrono::Utc;
use dashmap::DashMap;
use orderbook::{
    matcher, Level, Order, OrderBook, OrderId, OrderKind, OrderStatus, Side, Trade, TradeId,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::ApiError;
use crate::storage::Store;

/// A validated order submission, ready for the matching path.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub symbol: String,
    pub side: Side,
    pub kind: OrderKind,
    pub quantity: i64,
}

/// Result of a placement: the final order record and the trades it produced.
#[derive(Debug, Clone)]
pub struct Placement {
    pub order: Order,
    pub trades: Vec<Trade>,
}

pub struct Engine {
    books: DashMap<String, Arc<RwLock<OrderBook>>>,
    store: Store,
}

impl Engine {
    pub fn new(store: Store) -> Engine {
        Engine {
            books: DashMap::new(),
            store,
        }
    }

    /// Book for a symbol, created on first use. The entry API makes creation
    /// atomic; the Arc is cloned out so no shard guard is held across an
    /// await.
    fn book(&self, symbol: &str) -> Arc<RwLock<OrderBook>> {
        self.books
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(OrderBook::new())))
            .value()
            .clone()
    }

    /// Book for a symbol if one exists. Read paths must not create books.
    fn existing_book(&self, symbol: &str) -> Option<Arc<RwLock<OrderBook>>> {
        self.books.get(symbol).map(|entry| entry.value().clone())
    }

    /// Places an order: persist, match under the symbol lock, commit, then
    /// apply the outcome to the in-memory book.
    pub async fn place(&self, request: NewOrder) -> Result<Placement, ApiError> {
        let now = Utc::now();
        let mut order = Order {
            id: OrderId(0),
            symbol: request.symbol,
            side: request.side,
            kind: request.kind,
            quantity: request.quantity,
            remaining: request.quantity,
            status: OrderStatus::Open,
            created_at: now,
            updated_at: now,
        };

        let book = self.book(&order.symbol);
        let mut tx = self.store.begin().await?;
        order.id = self.store.insert_order(&mut tx, &order).await?;
        info!(order_id = order.id.0, symbol = %order.symbol, "processing order");

        let mut guard = book.write().await;
        let outcome = matcher::execute(&guard, &order);

        let mut trades = Vec::with_capacity(outcome.fills.len());
        for fill in &outcome.fills {
            let (buy_order_id, sell_order_id) = match order.side {
                Side::Buy => (order.id, fill.maker_id),
                Side::Sell => (fill.maker_id, order.id),
            };
            let mut trade = Trade {
                id: TradeId(0),
                symbol: order.symbol.clone(),
                buy_order_id,
                sell_order_id,
                price: fill.price,
                quantity: fill.quantity,
                created_at: now,
            };
            trade.id = self.store.insert_trade(&mut tx, &trade).await?;
            self.store
                .update_order(&mut tx, fill.maker_id, fill.maker_remaining, fill.maker_status(), now)
                .await?;
            info!(
                trade_id = trade.id.0,
                symbol = %trade.symbol,
                price = trade.price,
                quantity = trade.quantity,
                buy_order = trade.buy_order_id.0,
                sell_order = trade.sell_order_id.0,
                "trade executed"
            );
            trades.push(trade);
        }

        order.remaining = outcome.taker_remaining;
        order.status = outcome.taker_status;
        self.store
            .update_order(&mut tx, order.id, order.remaining, order.status, now)
            .await?;

        tx.commit().await?;
        guard.apply(&order, &outcome);

        Ok(Placement { order, trades })
    }

    /// Cancels a still-open order. A second cancel, or a cancel racing a
    /// fill, fails without mutating anything: the conditional UPDATE
    /// re-checks the status under the symbol lock.
    pub async fn cancel(&self, id: OrderId) -> Result<Order, ApiError> {
        let Some(order) = self.store.get_order(id).await? else {
            return Err(ApiError::NotFound(id));
        };
        match order.status {
            OrderStatus::Filled => {
                return Err(ApiError::IllegalState(
                    "cannot cancel a filled order".to_string(),
                ))
            }
            OrderStatus::Cancelled => {
                return Err(ApiError::IllegalState(
                    "order is already cancelled".to_string(),
                ))
            }
            OrderStatus::Open | OrderStatus::Partial => {}
        }

        let now = Utc::now();
        let book = self.book(&order.symbol);
        let mut tx = self.store.begin().await?;
        let mut guard = book.write().await;
        if !self.store.mark_cancelled(&mut tx, id, now).await? {
            return Err(ApiError::IllegalState(
                "order is no longer open".to_string(),
            ));
        }
        tx.commit().await?;
        guard.remove(id);
        info!(order_id = id.0, "order cancelled");

        Ok(Order {
            status: OrderStatus::Cancelled,
            updated_at: now,
            ..order
        })
    }

    /// Aggregated levels for a symbol, best first on each side. An unknown
    /// symbol is just an empty book.
    pub async fn snapshot(&self, symbol: &str) -> (Vec<Level>, Vec<Level>) {
        match self.existing_book(symbol) {
            Some(book) => book.read().await.snapshot(),
            None => (Vec::new(), Vec::new()),
        }
    }

    pub async fn order(&self, id: OrderId) -> Result<Order, ApiError> {
        self.store.get_order(id).await?.ok_or(ApiError::NotFound(id))
    }

    /// Trades for a symbol, newest first.
    pub async fn trades(&self, symbol: &str) -> Result<Vec<Trade>, ApiError> {
        Ok(self.store.trades_for_symbol(symbol).await?)
    }
}
