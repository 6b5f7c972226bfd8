//! Session State (§3): the process-local, per-client state the Replay
//! Engine owns exclusively. Created at connection, reset on `Start`, torn
//! down on disconnect.

use std::collections::VecDeque;
use std::time::Duration;

use crate::domain::candle::{Candle, Interval};
use crate::domain::shared::{Price, SimTime, SimulationId, Symbol};
use crate::domain::simulation::Speed;

/// Buffer memory high-water mark (§4.2 point 4): past this many base
/// candles, the oldest prefix is dropped.
pub const BUFFER_HIGH_WATER_MARK: usize = 5_000;

/// Minimum number of candles kept before `current_index` after a trim, so a
/// small rewind from a speed change still finds history in the buffer.
pub const BUFFER_REWIND_MARGIN: usize = 100;

/// Fraction of the buffer consumed past which a prefetch is triggered.
pub const PREFETCH_THRESHOLD: f64 = 0.8;

/// The Replay Engine's three states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    /// Initial and terminal state: no simulation in flight.
    Stopped,
    /// Virtual time is advancing and candles are being emitted.
    Playing,
    /// Advancement suspended; `currentSimTime` and the buffer are retained.
    Paused,
}

impl ReplayState {
    /// Render as the wire-format tag used in `StatusSnapshot`/`SimulationUpdate`.
    #[must_use]
    pub const fn as_tag(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }
}

/// Per-session state owned exclusively by the Replay Engine for one client
/// (§3). No sharing across sessions.
pub struct SessionState {
    /// Current lifecycle state.
    pub state: ReplayState,
    /// Traded symbol, set at `Start`.
    pub symbol: Option<Symbol>,
    /// Display (viewer) timeframe.
    pub display_interval: Option<Interval>,
    /// Base interval actually fetched and emitted.
    pub base_interval: Option<Interval>,
    /// Current replay speed.
    pub speed: Option<Speed>,
    /// Simulated-time start of the current session.
    pub start_time: Option<SimTime>,
    /// Current simulated time (advances every tick while `Playing`).
    pub current_sim_time: Option<SimTime>,
    /// `endTime` of the most recently emitted base candle.
    pub current_price_time: Option<SimTime>,
    /// `close` of the most recently emitted base candle.
    pub current_price: Option<Price>,
    /// The active `SimulationRecord`'s id.
    pub current_simulation_id: Option<SimulationId>,
    /// Ordered buffer of complete base candles, oldest first.
    pub base_dataset: VecDeque<Candle>,
    /// Index into `base_dataset` of the next candle to consider.
    pub current_index: usize,
    /// `endTime` of the last candle appended to the buffer, used as the
    /// next prefetch request's lower bound.
    pub last_loaded_end_time: Option<SimTime>,
    /// Wall/simulation marker of the last load attempt (diagnostic only).
    pub last_data_load_time: Option<SimTime>,
    /// Whether a background prefetch is currently in flight.
    pub is_loading_data: bool,
    /// Set once the Candle Source has returned an empty batch.
    pub no_more_data_available: bool,
    /// Real time between successive base-candle emissions.
    pub ticker_interval: Option<Duration>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            state: ReplayState::Stopped,
            symbol: None,
            display_interval: None,
            base_interval: None,
            speed: None,
            start_time: None,
            current_sim_time: None,
            current_price_time: None,
            current_price: None,
            current_simulation_id: None,
            base_dataset: VecDeque::new(),
            current_index: 0,
            last_loaded_end_time: None,
            last_data_load_time: None,
            is_loading_data: false,
            no_more_data_available: false,
            ticker_interval: None,
        }
    }
}

impl SessionState {
    /// Reset to a fresh `Playing` session, as `Start` does.
    #[allow(clippy::too_many_arguments)]
    pub fn reset_for_start(
        &mut self,
        symbol: Symbol,
        display_interval: Interval,
        base_interval: Interval,
        speed: Speed,
        start_time: SimTime,
        simulation_id: SimulationId,
        ticker_interval: Duration,
    ) {
        *self = Self {
            state: ReplayState::Playing,
            symbol: Some(symbol),
            display_interval: Some(display_interval),
            base_interval: Some(base_interval),
            speed: Some(speed),
            start_time: Some(start_time),
            current_sim_time: Some(start_time),
            current_price_time: Some(start_time),
            current_price: None,
            current_simulation_id: Some(simulation_id),
            ticker_interval: Some(ticker_interval),
            ..Self::default()
        };
    }

    /// The next buffered candle to consider, if any.
    #[must_use]
    pub fn next_candle(&self) -> Option<&Candle> {
        self.base_dataset.get(self.current_index)
    }

    /// Append a freshly fetched batch to the buffer and update the prefetch
    /// marker. An empty batch sets `no_more_data_available`.
    pub fn append_batch(&mut self, batch: Vec<Candle>) {
        if batch.is_empty() {
            self.no_more_data_available = true;
            return;
        }
        if let Some(last) = batch.last() {
            self.last_loaded_end_time = Some(last.end_time);
        }
        self.base_dataset.extend(batch);
    }

    /// Fraction of the buffer already consumed by `current_index`.
    #[must_use]
    pub fn consumption_ratio(&self) -> f64 {
        if self.base_dataset.is_empty() {
            return 0.0;
        }
        self.current_index as f64 / self.base_dataset.len() as f64
    }

    /// Whether a prefetch should be triggered: past the threshold, no load
    /// already in flight, and the source hasn't signalled exhaustion.
    #[must_use]
    pub fn should_prefetch(&self) -> bool {
        !self.is_loading_data && !self.no_more_data_available && self.consumption_ratio() >= PREFETCH_THRESHOLD
    }

    /// Whether the buffer is exhausted and no more data will ever arrive.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.no_more_data_available && self.current_index >= self.base_dataset.len()
    }

    /// Drop the oldest prefix once the buffer exceeds the high-water mark,
    /// keeping at least `BUFFER_REWIND_MARGIN` candles before
    /// `current_index` (§4.2 point 4).
    pub fn trim_buffer(&mut self) {
        if self.base_dataset.len() <= BUFFER_HIGH_WATER_MARK {
            return;
        }
        let droppable = self.current_index.saturating_sub(BUFFER_REWIND_MARGIN);
        let excess = self.base_dataset.len() - BUFFER_HIGH_WATER_MARK;
        let drop_count = droppable.min(excess);
        for _ in 0..drop_count {
            self.base_dataset.pop_front();
        }
        self.current_index -= drop_count;
    }

    /// Replace the buffer wholesale (used by `SetSpeed`'s reload when the
    /// base interval changes) and reposition `current_index` to the first
    /// candle whose `endTime` exceeds `current_price_time`.
    pub fn replace_buffer(&mut self, candles: Vec<Candle>) {
        self.base_dataset = candles.into();
        self.last_loaded_end_time = self.base_dataset.back().map(|c| c.end_time);
        let boundary = self.current_price_time.unwrap_or(SimTime::from_millis(0));
        self.current_index = self
            .base_dataset
            .iter()
            .position(|c| c.end_time > boundary)
            .unwrap_or(self.base_dataset.len());
    }
}
