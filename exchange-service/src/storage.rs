//! MySQL persistence for the order and trade audit trail.
//!
//! Prices are stored as integer ticks; the `price` column is NULL exactly
//! when the order is a market order. Ids come from `AUTO_INCREMENT`, so the
//! engine never mints them.

use chrono::{DateTime, Utc};
use orderbook::{Order, OrderId, OrderKind, OrderStatus, Side, Trade, TradeId};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::{FromRow, MySql, Transaction};
use std::time::Duration;

use crate::config::Config;

pub type Tx = Transaction<'static, MySql>;

const CREATE_ORDERS: &str = "\
CREATE TABLE IF NOT EXISTS orders (
    order_id BIGINT PRIMARY KEY AUTO_INCREMENT,
    symbol VARCHAR(20) NOT NULL,
    side ENUM('buy', 'sell') NOT NULL,
    type ENUM('limit', 'market') NOT NULL,
    price BIGINT,
    quantity BIGINT NOT NULL,
    remaining BIGINT NOT NULL,
    status ENUM('open', 'partial', 'filled', 'cancelled') NOT NULL,
    created_at TIMESTAMP(6) NOT NULL,
    updated_at TIMESTAMP(6) NOT NULL,
    KEY idx_orders_matching (symbol, side, status, price, created_at)
)";

const CREATE_TRADES: &str = "\
CREATE TABLE IF NOT EXISTS trades (
    trade_id BIGINT PRIMARY KEY AUTO_INCREMENT,
    symbol VARCHAR(20) NOT NULL,
    buy_order_id BIGINT NOT NULL,
    sell_order_id BIGINT NOT NULL,
    price BIGINT NOT NULL,
    quantity BIGINT NOT NULL,
    created_at TIMESTAMP(6) NOT NULL,
    KEY idx_trades_symbol_time (symbol, created_at DESC),
    FOREIGN KEY (buy_order_id) REFERENCES orders (order_id),
    FOREIGN KEY (sell_order_id) REFERENCES orders (order_id)
)";

#[derive(Clone)]
pub struct Store {
    pool: MySqlPool,
}

impl Store {
    /// Connects a pool sized from the configuration.
    pub async fn connect(cfg: &Config) -> Result<Store, sqlx::Error> {
        let pool = MySqlPoolOptions::new()
            .max_connections(cfg.database.max_open_conns)
            .min_connections(cfg.database.max_idle_conns)
            .max_lifetime(Duration::from_secs(cfg.database.conn_max_lifetime_seconds))
            .connect(&cfg.database_url())
            .await?;
        Ok(Store { pool })
    }

    /// Creates the orders and trades tables when absent.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(CREATE_ORDERS).execute(&self.pool).await?;
        sqlx::query(CREATE_TRADES).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn begin(&self) -> Result<Tx, sqlx::Error> {
        self.pool.begin().await
    }

    /// Inserts an order row and returns the store-assigned id.
    pub async fn insert_order(&self, tx: &mut Tx, order: &Order) -> Result<OrderId, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO orders \
             (symbol, side, type, price, quantity, remaining, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&order.symbol)
        .bind(order.side.as_str())
        .bind(order.kind.as_str())
        .bind(order.kind.price())
        .bind(order.quantity)
        .bind(order.remaining)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(OrderId(result.last_insert_id() as i64))
    }

    /// Persists fill progress on an order.
    pub async fn update_order(
        &self,
        tx: &mut Tx,
        id: OrderId,
        remaining: i64,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            "UPDATE orders SET remaining = ?, status = ?, updated_at = ? WHERE order_id = ?",
        )
        .bind(remaining)
        .bind(status.as_str())
        .bind(at)
        .bind(id.0)
        .execute(&mut **tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    /// Marks an order cancelled if it is still open. Returns false when the
    /// order was already terminal - the caller lost a race.
    pub async fn mark_cancelled(
        &self,
        tx: &mut Tx,
        id: OrderId,
        at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE orders SET status = 'cancelled', updated_at = ? \
             WHERE order_id = ? AND status IN ('open', 'partial')",
        )
        .bind(at)
        .bind(id.0)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_order(&self, id: OrderId) -> Result<Option<Order>, sqlx::Error> {
        let row: Option<OrderRow> = sqlx::query_as(
            "SELECT order_id, symbol, side, type, price, quantity, remaining, status, \
             created_at, updated_at FROM orders WHERE order_id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Order::try_from).transpose()
    }

    /// Inserts a trade row and returns the store-assigned id.
    pub async fn insert_trade(&self, tx: &mut Tx, trade: &Trade) -> Result<TradeId, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO trades (symbol, buy_order_id, sell_order_id, price, quantity, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&trade.symbol)
        .bind(trade.buy_order_id.0)
        .bind(trade.sell_order_id.0)
        .bind(trade.price)
        .bind(trade.quantity)
        .bind(trade.created_at)
        .execute(&mut **tx)
        .await?;
        Ok(TradeId(result.last_insert_id() as i64))
    }

    /// Trades for one symbol, newest first.
    pub async fn trades_for_symbol(&self, symbol: &str) -> Result<Vec<Trade>, sqlx::Error> {
        let rows: Vec<TradeRow> = sqlx::query_as(
            "SELECT trade_id, symbol, buy_order_id, sell_order_id, price, quantity, created_at \
             FROM trades WHERE symbol = ? ORDER BY created_at DESC, trade_id DESC",
        )
        .bind(symbol)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Trade::from).collect())
    }
}

#[derive(FromRow)]
struct OrderRow {
    order_id: i64,
    symbol: String,
    side: String,
    #[sqlx(rename = "type")]
    kind: String,
    price: Option<i64>,
    quantity: i64,
    remaining: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = sqlx::Error;

    fn try_from(row: OrderRow) -> Result<Order, sqlx::Error> {
        let side = Side::parse(&row.side)
            .ok_or_else(|| decode_error(format!("unknown side {:?}", row.side)))?;
        let status = OrderStatus::parse(&row.status)
            .ok_or_else(|| decode_error(format!("unknown status {:?}", row.status)))?;
        let kind = match (row.kind.as_str(), row.price) {
            ("limit", Some(price)) => OrderKind::Limit { price },
            ("limit", None) => {
                return Err(decode_error(format!(
                    "limit order {} has no price",
                    row.order_id
                )))
            }
            ("market", _) => OrderKind::Market,
            (other, _) => return Err(decode_error(format!("unknown order type {:?}", other))),
        };
        Ok(Order {
            id: OrderId(row.order_id),
            symbol: row.symbol,
            side,
            kind,
            quantity: row.quantity,
            remaining: row.remaining,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TradeRow {
    trade_id: i64,
    symbol: String,
    buy_order_id: i64,
    sell_order_id: i64,
    price: i64,
    quantity: i64,
    created_at: DateTime<Utc>,
}

impl From<TradeRow> for Trade {
    fn from(row: TradeRow) -> Trade {
        Trade {
            id: TradeId(row.trade_id),
            symbol: row.symbol,
            buy_order_id: OrderId(row.buy_order_id),
            sell_order_id: OrderId(row.sell_order_id),
            price: row.price,
            quantity: row.quantity,
            created_at: row.created_at,
        }
    }
}

fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(message.into())
}
