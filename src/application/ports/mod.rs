//! Driven ports (§6): the interfaces this crate's application services
//! depend on but does not implement. `infrastructure::*` ships in-memory
//! adapters so the engine is runnable and testable standalone.

mod candle_source;
mod client_sender;
mod persistence;

pub use candle_source::{CandleRequest, CandleSourceError, CandleSourcePort};
pub use client_sender::ClientSenderPort;
pub use persistence::{
    OrderRepository, PersistenceError, PositionRepository, SimulationRepository, TradeRepository,
};
