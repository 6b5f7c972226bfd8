// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Market Replay & Order Execution Engine
//!
//! A per-session market-replay trading simulator: reconstructs a historical
//! candle feed at a user-controlled speed and drives a market/limit order
//! execution engine against the replayed price.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: core business logic, no I/O, no async.
//!   - `candle`: OHLCV candle and interval types.
//!   - `simulation`: Base-Interval Selector policy, the persisted
//!     Simulation Record state machine.
//!   - `order_execution`: order/trade/position aggregates, the
//!     price-priority order book.
//!   - `shared`: value objects and errors used across all of the above.
//!
//! - **Application**: async orchestration over the domain, driven through
//!   `async_trait` ports.
//!   - `ports`: `CandleSourcePort`, `ClientSenderPort`, the persistence
//!     repository traits.
//!   - `replay`: the Replay Engine and its per-session state.
//!   - `order_execution`: the Order Execution Engine.
//!   - `supervisor`: the Session Supervisor tying both together per
//!     client connection.
//!   - `display`: the Display Aggregator.
//!
//! - **Infrastructure**: adapters implementing the application ports.
//!   - `persistence`: in-memory repositories.
//!   - `candle_source`: in-memory synthetic candle source.
//!   - `client_sender`: channel-backed client sender.
//!   - `config`: YAML + environment-variable configuration.
//!
//! - **Resilience**: cross-cutting concerns used by the application layer.
//!   - `retry`: fixed-schedule retry for Candle Source failures.
//!   - `circuit_breaker`: failure-rate circuit breaker for the same.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Domain layer - core business logic with no external dependencies.
pub mod domain;

/// Application layer - async services, ports, and the Session Supervisor.
pub mod application;

/// Infrastructure layer - adapters and configuration loading.
pub mod infrastructure;

/// Resilience - retry and circuit-breaker helpers for the Candle Source.
pub mod resilience;

pub use application::order_execution::OrderExecutionEngine;
pub use application::ports::{
    CandleRequest, CandleSourceError, CandleSourcePort, ClientSenderPort, OrderRepository,
    PersistenceError, PositionRepository, SimulationRepository, TradeRepository,
};
pub use application::replay::{ReplayEngine, ReplayState, DEFAULT_BASE_CURRENCY};
pub use application::supervisor::{SessionSupervisor, SupervisorError};
pub use application::{ClientMessage, ControlMessage, StatusSnapshot};

pub use domain::candle::{Candle, Interval};
pub use domain::order_execution::{Order, OrderBook, OrderError, Position, Trade};
pub use domain::shared::{DomainError, OrderId, Price, Quantity, SimTime, SimulationId, Symbol, TradeId, UserId};
pub use domain::simulation::{ReplayError, SimulationRecord, SimulationStatus};

pub use infrastructure::candle_source::InMemoryCandleSource;
pub use infrastructure::client_sender::ChannelClientSender;
pub use infrastructure::config::{load_config, Config, ConfigError};
pub use infrastructure::persistence::{
    InMemoryOrderRepository, InMemoryPositionRepository, InMemorySimulationRepository, InMemoryTradeRepository,
};
