//! Persistence Adapters
//!
//! In-memory implementations of the `application::ports::persistence`
//! traits. A SQL adapter would live alongside `in_memory` here, behind the
//! same trait seam.

pub mod in_memory;

pub use in_memory::{
    InMemoryOrderRepository, InMemoryPositionRepository, InMemorySimulationRepository,
    InMemoryTradeRepository,
};
