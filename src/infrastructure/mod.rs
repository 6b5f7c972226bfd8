//! Infrastructure Layer
//!
//! Adapters implementing the ports defined in the application layer. Every
//! external collaborator the core spec treats as out of scope (§1) — the
//! historical-data source, the real persistence layer, the duplex
//! transport — gets an in-memory or channel-backed adapter here so the
//! engine is runnable and testable standalone. A production deployment
//! swaps these for a SQL persistence adapter, a market-data provider
//! adapter, and a websocket transport, without touching `application::*`.
//!
//! - `persistence`: in-memory `SimulationRepository` / `OrderRepository` /
//!   `TradeRepository` / `PositionRepository`.
//! - `candle_source`: in-memory `CandleSourcePort` with a synthetic price
//!   path.
//! - `client_sender`: channel-backed `ClientSenderPort`.
//! - `config`: YAML + environment-variable configuration loading for the
//!   engine's own tuning knobs.

pub mod candle_source;
pub mod client_sender;
pub mod config;
pub mod persistence;
