//! Session Supervisor (§2, §5): per-connection orchestration tying the
//! Replay Engine and Order Execution Engine to a control-message channel.

mod session_supervisor;

pub use session_supervisor::{SessionSupervisor, SupervisorError};
