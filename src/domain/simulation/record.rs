//! The Simulation Record: persisted metadata for one replay session, and
//! its status state machine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::shared::{DomainError, Price, SimTime, SimulationId, Symbol, UserId};

/// Market mode a simulation is running under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Spot market: positions are held outright.
    Spot,
    /// Futures market.
    Future,
}

/// Lifecycle status of a Simulation Record.
///
/// Never regresses except `Paused -> Running` via `Resume`; `Stopped` and
/// `Completed` are both terminal, reached only through `Stop` or natural
/// end-of-data respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationStatus {
    /// Actively advancing simulated time.
    Running,
    /// Advancement suspended; can resume.
    Paused,
    /// Stopped by explicit client request.
    Stopped,
    /// Ran out of source data and stopped naturally.
    Completed,
}

impl SimulationStatus {
    const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Completed)
    }
}

/// Persisted metadata for one replay session.
///
/// Created by the Replay Engine at `Start`, mutated on every state
/// transition, and never deleted — it remains queryable for history after
/// the session ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRecord {
    /// Unique identifier.
    pub id: SimulationId,
    /// Owning user.
    pub user_id: UserId,
    /// Traded symbol.
    pub symbol: Symbol,
    /// Simulated-time start, milliseconds.
    pub start_sim_time: SimTime,
    /// Simulated-time end, milliseconds. Updated on pause/stop/complete.
    pub end_sim_time: Option<SimTime>,
    /// Initial cash funding in base-currency units.
    pub initial_funding: Price,
    /// Market mode.
    pub mode: Mode,
    /// Opaque client-chosen settings: initial speed, initial timeframe.
    pub extra_configs: Value,
    /// Current lifecycle status.
    pub status: SimulationStatus,
    /// Portfolio value snapshot, populated at terminal transitions.
    pub total_value: Option<Price>,
}

impl SimulationRecord {
    /// Create a new record in `running` status, as `Start` does.
    #[must_use]
    pub fn start(
        id: SimulationId,
        user_id: UserId,
        symbol: Symbol,
        start_sim_time: SimTime,
        initial_funding: Price,
        mode: Mode,
        extra_configs: Value,
    ) -> Self {
        Self {
            id,
            user_id,
            symbol,
            start_sim_time,
            end_sim_time: None,
            initial_funding,
            mode,
            extra_configs,
            status: SimulationStatus::Running,
            total_value: None,
        }
    }

    /// Transition to `paused`, snapshotting `end_sim_time` and `total_value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is not currently `running`.
    pub fn pause(&mut self, at: SimTime, total_value: Price) -> Result<(), DomainError> {
        self.require_status(SimulationStatus::Running, "Pause")?;
        self.status = SimulationStatus::Paused;
        self.end_sim_time = Some(at);
        self.total_value = Some(total_value);
        Ok(())
    }

    /// Transition back to `running`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is not currently `paused`.
    pub fn resume(&mut self) -> Result<(), DomainError> {
        self.require_status(SimulationStatus::Paused, "Resume")?;
        self.status = SimulationStatus::Running;
        Ok(())
    }

    /// Transition to `stopped`. Idempotent: calling on an already-terminal
    /// record leaves it unchanged.
    pub fn stop(&mut self, at: SimTime, total_value: Price) {
        if self.status.is_terminal() {
            return;
        }
        self.status = SimulationStatus::Stopped;
        self.end_sim_time = Some(at);
        self.total_value = Some(total_value);
    }

    /// Transition to `completed`, as the Replay Engine does on exhausting
    /// the Candle Source with no more data available.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is already terminal.
    pub fn complete(&mut self, at: SimTime, total_value: Price) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                entity: "SimulationRecord".to_string(),
                from: format!("{:?}", self.status),
                to: "Completed".to_string(),
                reason: "record is already terminal".to_string(),
            });
        }
        self.status = SimulationStatus::Completed;
        self.end_sim_time = Some(at);
        self.total_value = Some(total_value);
        Ok(())
    }

    fn require_status(
        &self,
        expected: SimulationStatus,
        operation: &str,
    ) -> Result<(), DomainError> {
        if self.status != expected {
            return Err(DomainError::InvalidStateTransition {
                entity: "SimulationRecord".to_string(),
                from: format!("{:?}", self.status),
                to: operation.to_string(),
                reason: format!("{operation} requires status {expected:?}"),
            });
        }
        Ok(())
    }
}
