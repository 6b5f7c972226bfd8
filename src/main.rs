//! Replay demo binary
//!
//! Starts one in-process client session against the in-memory adapters:
//! registers a synthetic symbol, starts a replay, places a couple of
//! orders, and prints every message the engine emits until disconnect.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin replay-demo
//! ```
//!
//! # Environment variables
//!
//! - `REPLAY_CONFIG`: path to a YAML config file (default: `config.yaml`,
//!   falling back to built-in defaults if absent).
//! - `RUST_LOG`: log level (default: info).

use std::sync::Arc;
use std::time::Duration;

use market_replay_engine::application::{ControlMessage, ClientMessage};
use market_replay_engine::domain::candle::Interval;
use market_replay_engine::domain::order_execution::value_objects::{OrderSide, OrderType};
use market_replay_engine::domain::shared::{Price, Quantity, SimTime, Symbol, UserId};
use market_replay_engine::infrastructure::candle_source::{InMemoryCandleSource, SyntheticSeries};
use market_replay_engine::infrastructure::client_sender::ChannelClientSender;
use market_replay_engine::infrastructure::config::{self, Config};
use market_replay_engine::infrastructure::persistence::{
    InMemoryOrderRepository, InMemoryPositionRepository, InMemorySimulationRepository, InMemoryTradeRepository,
};
use market_replay_engine::SessionSupervisor;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("market_replay_engine=info".parse().expect("static directive parses")),
        )
        .init();

    tracing::info!("starting replay demo session");

    let config_path = std::env::var("REPLAY_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = config::load_config(Some(&config_path)).unwrap_or_else(|err| {
        tracing::warn!(error = %err, path = %config_path, "falling back to built-in config defaults");
        Config::default()
    });

    let candle_source = Arc::new(InMemoryCandleSource::new());
    candle_source.register("BTC", SyntheticSeries::default());

    let simulations = Arc::new(InMemorySimulationRepository::new());
    let orders = Arc::new(InMemoryOrderRepository::new());
    let trades = Arc::new(InMemoryTradeRepository::new());
    let positions = Arc::new(InMemoryPositionRepository::new());

    let (sender, mut outbound) = ChannelClientSender::new();
    let sender = Arc::new(sender);

    let supervisor = Arc::new(SessionSupervisor::new(
        candle_source,
        simulations,
        orders,
        trades,
        positions,
        sender,
        UserId::generate(),
    ));

    let printer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            log_message(&message);
        }
    });

    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let (disconnect_tx, disconnect_rx) = mpsc::channel(1);

    let worker = tokio::spawn({
        let supervisor = Arc::clone(&supervisor);
        async move {
            supervisor.run(control_rx, disconnect_rx).await;
        }
    });

    let _ = control_tx.send(ControlMessage::SimulationControlStart {
        symbol: Symbol::new("BTC"),
        start_time: SimTime::from_millis(0),
        interval: Interval::OneMinute,
        speed: 60,
        initial_funding: Price::from_f64(config.session.default_initial_funding),
    });

    tokio::time::sleep(Duration::from_millis(500)).await;
    let _ = control_tx.send(ControlMessage::OrderPlace {
        symbol: Symbol::new("BTC"),
        side: OrderSide::Buy,
        order_type: OrderType::Market,
        quantity: Quantity::from_i64(1),
        limit_price: None,
    });

    tokio::time::sleep(Duration::from_secs(5)).await;
    let _ = disconnect_tx.send(()).await;
    let _ = worker.await;
    drop(control_tx);
    drop(supervisor);
    let _ = printer.await;
    Ok(())
}

fn log_message(message: &ClientMessage) {
    match serde_json::to_string(message) {
        Ok(json) => println!("{json}"),
        Err(err) => tracing::error!(error = %err, "failed to serialize client message"),
    }
}
