use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "exchange-cli")]
#[command(about = "Command line client for the matching engine API")]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    server: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Place a limit or market order
    Submit {
        #[arg(short = 's', long)]
        symbol: String,
        #[arg(long, value_parser = parse_side)]
        side: String,
        #[arg(short = 't', long = "type", value_parser = parse_order_type)]
        order_type: String,
        /// Price in ticks; required for limit orders, omitted for market
        #[arg(short = 'p', long)]
        price: Option<i64>,
        #[arg(short = 'q', long)]
        quantity: i64,
    },
    /// Fetch an order by id
    Status {
        #[arg(short, long)]
        order_id: i64,
    },
    /// Cancel a still-open order
    Cancel {
        #[arg(short, long)]
        order_id: i64,
    },
    /// Show the aggregated book for a symbol
    Book {
        #[arg(short, long)]
        symbol: String,
    },
    /// List trades for a symbol, newest first
    Trades {
        #[arg(short, long)]
        symbol: String,
    },
    Health,
}

#[derive(Serialize)]
struct SubmitOrderRequest {
    symbol: String,
    side: String,
    #[serde(rename = "type")]
    order_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<i64>,
    quantity: i64,
}

#[derive(Deserialize)]
struct SubmitOrderResponse {
    order_id: i64,
    status: String,
    trades: Vec<TradeView>,
}

#[derive(Deserialize)]
struct TradeView {
    trade_id: i64,
    price: i64,
    quantity: i64,
}

#[derive(Deserialize)]
struct OrderView {
    order_id: i64,
    symbol: String,
    side: String,
    #[serde(rename = "type")]
    order_type: String,
    price: Option<i64>,
    quantity: i64,
    remaining: i64,
    status: String,
}

#[derive(Deserialize)]
struct LevelView {
    price: i64,
    quantity: i64,
    orders: usize,
}

#[derive(Deserialize)]
struct OrderBookView {
    symbol: String,
    bids: Vec<LevelView>,
    asks: Vec<LevelView>,
}

#[derive(Deserialize)]
struct TradesView {
    trades: Vec<TradeView>,
}

fn parse_side(s: &str) -> Result<String, String> {
    match s.to_lowercase().as_str() {
        "buy" | "bid" => Ok("buy".to_string()),
        "sell" | "ask" => Ok("sell".to_string()),
        _ => Err(format!("Invalid side: {}. Use 'buy' or 'sell'", s)),
    }
}

fn parse_order_type(s: &str) -> Result<String, String> {
    match s.to_lowercase().as_str() {
        "limit" => Ok("limit".to_string()),
        "market" => Ok("market".to_string()),
        _ => Err(format!("Invalid type: {}. Use 'limit' or 'market'", s)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Submit { symbol, side, order_type, price, quantity } => {
            let request = SubmitOrderRequest { symbol, side, order_type, price, quantity };

            let response = client
                .post(format!("{}/api/orders", cli.server))
                .json(&request)
                .send()
                .await?;

            if response.status().is_success() {
                let result: SubmitOrderResponse = response.json().await?;

                println!("Order ID: {}", result.order_id);
                println!("Status: {}", result.status);

                if !result.trades.is_empty() {
                    println!("Trades executed: {}", result.trades.len());
                    for trade in result.trades {
                        println!("  #{}: {} @ {} ticks", trade.trade_id, trade.quantity, trade.price);
                    }
                }
            } else {
                println!("Error: {}", response.status());
                println!("{}", response.text().await?);
            }
        }

        Commands::Status { order_id } => {
            let response = client
                .get(format!("{}/api/orders/{}", cli.server, order_id))
                .send()
                .await?;

            if response.status().is_success() {
                let order: OrderView = response.json().await?;
                println!("Order ID: {}", order.order_id);
                println!("Symbol: {}", order.symbol);
                println!("Side: {}", order.side);
                println!("Type: {}", order.order_type);
                if let Some(price) = order.price {
                    println!("Price: {}", price);
                }
                println!("Quantity: {}", order.quantity);
                println!("Remaining: {}", order.remaining);
                println!("Status: {}", order.status);
            } else {
                println!("Error: {}", response.status());
                println!("{}", response.text().await?);
            }
        }

        Commands::Cancel { order_id } => {
            let response = client
                .delete(format!("{}/api/orders/{}", cli.server, order_id))
                .send()
                .await?;

            if response.status().is_success() {
                let result: serde_json::Value = response.json().await?;
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Error: {}", response.status());
                println!("{}", response.text().await?);
            }
        }

        Commands::Book { symbol } => {
            let response = client
                .get(format!("{}/api/orderbook?symbol={}", cli.server, symbol))
                .send()
                .await?;

            if response.status().is_success() {
                let book: OrderBookView = response.json().await?;

                println!("Order book for {}", book.symbol);
                println!("\nAsks:");
                for (i, level) in book.asks.iter().enumerate() {
                    println!("  {}: {} @ {} ({} orders)", i + 1, level.quantity, level.price, level.orders);
                }

                println!("\nBids:");
                for (i, level) in book.bids.iter().enumerate() {
                    println!("  {}: {} @ {} ({} orders)", i + 1, level.quantity, level.price, level.orders);
                }
            } else {
                println!("Error: {}", response.status());
                println!("{}", response.text().await?);
            }
        }

        Commands::Trades { symbol } => {
            let response = client
                .get(format!("{}/api/trades?symbol={}", cli.server, symbol))
                .send()
                .await?;

            if response.status().is_success() {
                let result: TradesView = response.json().await?;
                if result.trades.is_empty() {
                    println!("No trades for {}", symbol);
                }
                for trade in result.trades {
                    println!("#{}: {} @ {} ticks", trade.trade_id, trade.quantity, trade.price);
                }
            } else {
                println!("Error: {}", response.status());
                println!("{}", response.text().await?);
            }
        }

        Commands::Health => {
            let response = client
                .get(format!("{}/health", cli.server))
                .send()
                .await?;

            if response.status().is_success() {
                let health: serde_json::Value = response.json().await?;
                println!("{}", serde_json::to_string_pretty(&health)?);
            } else {
                println!("Error: {}", response.status());
            }
        }
    }

    Ok(())
}
