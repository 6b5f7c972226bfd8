//! Domain Layer
//!
//! The innermost layer containing business logic with zero infrastructure
//! dependencies. This layer defines:
//!
//! - **Aggregates**: Consistency boundaries with invariants
//! - **Value Objects**: Immutable domain types with equality by value
//! - **Domain Events**: Records of state transitions
//! - **Domain Services**: Stateless business logic
//!
//! # Bounded Contexts
//!
//! - [`candle`]: OHLCV candle and interval types, shared by every other context.
//! - [`simulation`]: the Base-Interval Selector policy and the persisted
//!   Simulation Record state machine.
//! - [`order_execution`]: order/trade/position aggregates, the price-priority
//!   order book, and domain events.
//! - [`shared`]: value objects and errors used across all of the above.

pub mod candle;
pub mod order_execution;
pub mod shared;
pub mod simulation;
