//! The Replay Engine application service (§3, §4.2) and its session state.

mod engine;
mod session_state;

pub use engine::{ReplayEngine, DEFAULT_BASE_CURRENCY};
pub use session_state::{ReplayState, SessionState};
