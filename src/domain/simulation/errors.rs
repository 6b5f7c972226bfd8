//! Replay Engine failure modes.

use thiserror::Error;

use crate::domain::shared::SimulationId;

/// Failure modes surfaced by the Replay Engine's public operations.
#[derive(Debug, Clone, Error)]
pub enum ReplayError {
    /// `Start` was called while a simulation was already running for this
    /// session.
    #[error("simulation {0} is already running")]
    AlreadyRunning(SimulationId),

    /// Speed was zero, negative, or otherwise not a usable replay rate.
    #[error("invalid speed: {0}")]
    InvalidSpeed(String),

    /// The requested display timeframe is narrower than
    /// `minAllowedDisplay(speed)` for the current speed.
    #[error("invalid timeframe: {0}")]
    InvalidTimeframe(String),

    /// The Candle Source returned no data for the requested symbol/range.
    #[error("no data available for {symbol} starting at {start_time_ms}")]
    NoData {
        /// Requested symbol.
        symbol: String,
        /// Requested start time, simulation milliseconds.
        start_time_ms: i64,
    },

    /// An operation requires a session in a different state than the one
    /// it's currently in (e.g. `Pause` while `Stopped`).
    #[error("invalid session state for {operation}: expected {expected}, was {actual}")]
    InvalidState {
        /// Operation attempted.
        operation: String,
        /// State required.
        expected: String,
        /// State the session was actually in.
        actual: String,
    },
}
