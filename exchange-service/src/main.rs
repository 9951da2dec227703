//! Matching engine HTTP service: configuration, storage, engine, router.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use orderbook::OrderId;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

mod config;
mod engine;
mod error;
mod storage;
mod types;

use config::Config;
use engine::Engine;
use error::{ApiError, FieldError};
use storage::Store;
use types::{
    CancelOrderResponse, GetOrderResponse, OrderBookResponse, OrderRecord, PlaceOrderRequest,
    PlaceOrderResponse, SymbolQuery, TradesResponse,
};

#[derive(Parser)]
#[command(name = "exchange-service", about = "Order matching engine HTTP service")]
struct Args {
    /// Path to the YAML config file; the CONFIG_PATH env var takes precedence.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(args.config)?;

    let store = Store::connect(&cfg).await?;
    store.ensure_schema().await?;
    info!(env = %cfg.env, "storage initialized");

    let engine = Arc::new(Engine::new(store));
    let app = router(engine);

    let listener = tokio::net::TcpListener::bind(&cfg.http_server.address).await?;
    info!(address = %cfg.http_server.address, "server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server shut down");
    Ok(())
}

fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/orders", post(place_order))
        .route("/api/orders/:order_id", get(get_order).delete(cancel_order))
        .route("/api/orderbook", get(get_orderbook))
        .route("/api/trades", get(list_trades))
        .layer(CorsLayer::permissive())
        .with_state(engine)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "exchange-service",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn place_order(
    State(engine): State<Arc<Engine>>,
    Json(body): Json<PlaceOrderRequest>,
) -> Result<Json<PlaceOrderResponse>, ApiError> {
    let request = body.validate()?;
    let placement = engine.place(request).await?;
    Ok(Json(PlaceOrderResponse {
        message: "order placed successfully",
        order_id: placement.order.id,
        status: placement.order.status,
        trades: placement.trades,
    }))
}

async fn get_order(
    State(engine): State<Arc<Engine>>,
    Path(order_id): Path<String>,
) -> Result<Json<GetOrderResponse>, ApiError> {
    let id = parse_order_id(&order_id)?;
    let order = engine.order(id).await?;
    Ok(Json(GetOrderResponse {
        message: "order fetched successfully",
        order: OrderRecord::from(order),
    }))
}

async fn cancel_order(
    State(engine): State<Arc<Engine>>,
    Path(order_id): Path<String>,
) -> Result<Json<CancelOrderResponse>, ApiError> {
    let id = parse_order_id(&order_id)?;
    let order = engine.cancel(id).await?;
    Ok(Json(CancelOrderResponse {
        message: "order cancelled successfully",
        order_id: order.id,
        status: order.status,
    }))
}

async fn get_orderbook(
    State(engine): State<Arc<Engine>>,
    Query(query): Query<SymbolQuery>,
) -> Result<Json<OrderBookResponse>, ApiError> {
    let symbol = query.require()?;
    let (bids, asks) = engine.snapshot(&symbol).await;
    Ok(Json(OrderBookResponse {
        message: "order book retrieved successfully",
        symbol,
        bids,
        asks,
    }))
}

async fn list_trades(
    State(engine): State<Arc<Engine>>,
    Query(query): Query<SymbolQuery>,
) -> Result<Json<TradesResponse>, ApiError> {
    let symbol = query.require()?;
    let trades = engine.trades(&symbol).await?;
    Ok(Json(TradesResponse {
        message: "trades fetched successfully",
        symbol,
        trades,
    }))
}

fn parse_order_id(raw: &str) -> Result<OrderId, ApiError> {
    raw.parse::<i64>()
        .map(OrderId)
        .map_err(|_| ApiError::Validation(vec![FieldError::new("order_id", "must be a numeric id")]))
}
