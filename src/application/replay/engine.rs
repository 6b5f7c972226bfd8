//! Replay Engine (§4.2): a deterministic virtual-clock state machine that
//! consumes a base-interval candle stream and emits complete base candles
//! at paced intervals, invoking the Order Execution Engine on each price
//! advance.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::{mpsc, Mutex};

use crate::application::messages::{ClientMessage, StatusSnapshot};
use crate::application::order_execution::OrderExecutionEngine;
use crate::application::ports::{
    CandleRequest, CandleSourcePort, ClientSenderPort, OrderRepository, PersistenceError,
    PositionRepository, SimulationRepository, TradeRepository,
};
use crate::application::replay::session_state::{ReplayState, SessionState};
use crate::domain::candle::Interval;
use crate::domain::order_execution::Position;
use crate::domain::shared::{Price, SimTime, SimulationId, Symbol, UserId};
use crate::domain::simulation::{
    select_base_interval, ticker_interval, validate_timeframe, Mode, ReplayError, Speed,
    SimulationRecord,
};
use crate::resilience::retry::retry_candle_source_load;
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig};

/// Number of base candles requested per Candle Source fetch.
const BATCH_SIZE: u32 = 500;

/// Base-interval candles fetched backwards as a safety margin when `SetSpeed`
/// changes the base interval (§9 design note): chosen wide enough that no
/// partial candle straddles the realignment boundary.
const REWIND_SAFETY_MARGIN_CANDLES: i64 = 10;

/// Quote-side asset used for the cash position when a session starts.
///
/// `Start`'s spec'd signature (§4.2) does not carry a `baseCurrency`
/// parameter; this engine fixes it to the conventional quote currency.
/// Documented as a decision in `DESIGN.md`.
pub const DEFAULT_BASE_CURRENCY: &str = "USD";

enum PrefetchOutcome {
    Loaded(Vec<crate::domain::candle::Candle>),
    Failed(String),
}

/// One client session's Replay Engine: owns the virtual clock, the base
/// candle buffer, and the emission loop, paired with one Order Execution
/// Engine (§2).
pub struct ReplayEngine<Cs, Sim, O, T, P, Snd>
where
    Cs: CandleSourcePort + 'static,
    Sim: SimulationRepository,
    O: OrderRepository,
    T: TradeRepository,
    P: PositionRepository,
    Snd: ClientSenderPort,
{
    candle_source: Arc<Cs>,
    simulations: Arc<Sim>,
    positions: Arc<P>,
    sender: Arc<Snd>,
    order_engine: Arc<OrderExecutionEngine<O, T, P, Snd>>,
    user_id: UserId,
    state: Mutex<SessionState>,
    prefetch_tx: mpsc::UnboundedSender<PrefetchOutcome>,
    prefetch_rx: Mutex<mpsc::UnboundedReceiver<PrefetchOutcome>>,
    /// Trips after repeated Candle Source failures so a stalled source
    /// fails fast instead of being hammered by every tick's prefetch and
    /// every `SetSpeed` reload (§7, External/Transient).
    candle_source_breaker: CircuitBreaker,
    /// §9 open question, decided here: whether `Stop` clears
    /// `currentPriceTime` (`true`) or preserves it for a subsequent
    /// `Resume`-style history read (`false`). Exposed so both branches are
    /// testable, as §9 asks for this specific question.
    stop_clears_price_time: bool,
}

impl<Cs, Sim, O, T, P, Snd> ReplayEngine<Cs, Sim, O, T, P, Snd>
where
    Cs: CandleSourcePort + 'static,
    Sim: SimulationRepository,
    O: OrderRepository,
    T: TradeRepository,
    P: PositionRepository,
    Snd: ClientSenderPort,
{
    /// Construct a new engine for one client, in the initial `Stopped` state.
    pub fn new(
        candle_source: Arc<Cs>,
        simulations: Arc<Sim>,
        positions: Arc<P>,
        sender: Arc<Snd>,
        order_engine: Arc<OrderExecutionEngine<O, T, P, Snd>>,
        user_id: UserId,
    ) -> Self {
        let (prefetch_tx, prefetch_rx) = mpsc::unbounded_channel();
        Self {
            candle_source,
            simulations,
            positions,
            sender,
            order_engine,
            user_id,
            state: Mutex::new(SessionState::default()),
            prefetch_tx,
            prefetch_rx: Mutex::new(prefetch_rx),
            candle_source_breaker: CircuitBreaker::new("candle-source", CircuitBreakerConfig::candle_source()),
            stop_clears_price_time: false,
        }
    }

    /// Fetch a batch of candles through the retry schedule (§4.2, §7),
    /// gated by the Candle Source circuit breaker: while the breaker is
    /// open, fails fast without attempting the call at all.
    async fn load_candles(&self, request: CandleRequest) -> Result<Vec<crate::domain::candle::Candle>, String> {
        if !self.candle_source_breaker.is_call_permitted() {
            return Err(format!("candle source circuit breaker is {}", self.candle_source_breaker.state()));
        }
        match retry_candle_source_load(|| self.candle_source.fetch(request.clone())).await {
            Ok(candles) => {
                self.candle_source_breaker.record_success();
                Ok(candles)
            }
            Err(err) => {
                self.candle_source_breaker.record_failure();
                Err(err.to_string())
            }
        }
    }

    /// Like `new`, but decides the §9 `Stop`/`currentPriceTime` question the
    /// other way: `Stop` clears `currentPriceTime` rather than preserving it.
    #[must_use]
    pub fn with_stop_clears_price_time(mut self, clears: bool) -> Self {
        self.stop_clears_price_time = clears;
        self
    }

    /// `Start` (§4.2): validate, fetch the first buffer, create the
    /// Simulation Record and the initial cash position, and begin emitting.
    ///
    /// # Errors
    ///
    /// Returns `ReplayError::AlreadyRunning`, `InvalidSpeed`,
    /// `InvalidTimeframe`, or `NoData` per §4.2.
    pub async fn start(
        &self,
        symbol: Symbol,
        display_interval: Interval,
        start_time: SimTime,
        speed: Speed,
        initial_funding: Price,
    ) -> Result<(), ReplayError> {
        {
            let guard = self.state.lock().await;
            if guard.state != ReplayState::Stopped {
                return Err(ReplayError::AlreadyRunning(
                    guard.current_simulation_id.clone().unwrap_or_else(|| SimulationId::new("unknown")),
                ));
            }
        }

        if speed <= 0 {
            return Err(ReplayError::InvalidSpeed(format!("speed must be positive, got {speed}")));
        }
        let base_interval = select_base_interval(speed).map_err(|e| ReplayError::InvalidSpeed(e.to_string()))?;
        validate_timeframe(speed, display_interval).map_err(|e| ReplayError::InvalidTimeframe(e.to_string()))?;

        let request = CandleRequest {
            symbol: symbol.clone(),
            interval: base_interval,
            from: start_time,
            to: None,
            limit: BATCH_SIZE,
            allow_incomplete: false,
        };
        let candles = self.load_candles(request).await.map_err(|_| ReplayError::NoData {
            symbol: symbol.to_string(),
            start_time_ms: start_time.millis(),
        })?;
        if candles.is_empty() {
            return Err(ReplayError::NoData {
                symbol: symbol.to_string(),
                start_time_ms: start_time.millis(),
            });
        }

        let simulation_id = SimulationId::generate();
        let record = SimulationRecord::start(
            simulation_id.clone(),
            self.user_id.clone(),
            symbol.clone(),
            start_time,
            initial_funding,
            Mode::Spot,
            serde_json::json!({ "initialSpeed": speed, "initialDisplayInterval": display_interval.as_tag() }),
        );
        self.simulations.create(record).await.map_err(replay_persistence_error)?;

        let base_currency = Symbol::new(DEFAULT_BASE_CURRENCY);
        self.positions
            .create(Position::initial_cash(self.user_id.clone(), simulation_id.clone(), base_currency, initial_funding))
            .await
            .map_err(replay_persistence_error)?;

        self.order_engine
            .load_pending_orders(&simulation_id)
            .await
            .map_err(|e| ReplayError::InvalidState {
                operation: "Start".to_string(),
                expected: "loadable order book".to_string(),
                actual: e.to_string(),
            })?;

        let ticker = ticker_interval(speed, base_interval);
        {
            let mut guard = self.state.lock().await;
            guard.reset_for_start(symbol, display_interval, base_interval, speed, start_time, simulation_id, ticker);
            guard.append_batch(candles);
        }

        self.emit_status_update("session started").await;
        Ok(())
    }

    /// `Pause` (§4.2): precondition `Playing`. Snapshots `totalValue` and
    /// `endSimTime` onto the Simulation Record.
    ///
    /// # Errors
    ///
    /// Returns `ReplayError::InvalidState` if not currently `Playing`.
    pub async fn pause(&self) -> Result<(), ReplayError> {
        let mut guard = self.state.lock().await;
        require_state(&guard, ReplayState::Playing, "Pause")?;
        let total_value = self.portfolio_value(&guard).await.map_err(replay_persistence_error)?;
        self.persist_transition(&mut guard, |record, at| record.pause(at, total_value)).await?;
        guard.state = ReplayState::Paused;
        drop(guard);
        self.emit_status_update("session paused").await;
        Ok(())
    }

    /// `Resume` (§4.2): precondition `Paused`.
    ///
    /// # Errors
    ///
    /// Returns `ReplayError::InvalidState` if not currently `Paused`.
    pub async fn resume(&self) -> Result<(), ReplayError> {
        let mut guard = self.state.lock().await;
        require_state(&guard, ReplayState::Paused, "Resume")?;
        self.persist_transition(&mut guard, |record, _at| record.resume()).await?;
        guard.state = ReplayState::Playing;
        drop(guard);
        self.emit_status_update("session resumed").await;
        Ok(())
    }

    /// `Stop` (§4.2): idempotent; always ends in `Stopped` with a terminal
    /// `totalValue`/`endSimTime` on the Simulation Record.
    ///
    /// # Errors
    ///
    /// Returns `ReplayError::InvalidState` only if the record could not be
    /// loaded for an active simulation (never on a simulation already
    /// `Stopped`, which is a no-op).
    pub async fn stop(&self) -> Result<(), ReplayError> {
        let mut guard = self.state.lock().await;
        if guard.state == ReplayState::Stopped {
            return Ok(());
        }
        let total_value = self.portfolio_value(&guard).await.map_err(replay_persistence_error)?;
        let at = guard.current_sim_time.unwrap_or(SimTime::from_millis(0));
        if let Some(simulation_id) = guard.current_simulation_id.clone() {
            if let Some(mut record) = self.simulations.find(&simulation_id).await.map_err(replay_persistence_error)? {
                record.stop(at, total_value);
                self.simulations.update(&record).await.map_err(replay_persistence_error)?;
            }
        }
        guard.state = ReplayState::Stopped;
        guard.base_dataset.clear();
        guard.current_index = 0;
        if self.stop_clears_price_time {
            guard.current_price_time = None;
        }
        drop(guard);
        self.emit_status_update("session stopped").await;
        Ok(())
    }

    /// `SetSpeed` (§4.2): precondition `Playing` (§9: a stopped/paused
    /// session has no running emission loop for the change to enqueue
    /// into). If the base interval changes, the buffer is reloaded aligned
    /// to the new interval with a backward safety margin.
    ///
    /// # Errors
    ///
    /// Returns `ReplayError::InvalidSpeed` for a non-positive speed,
    /// `ReplayError::InvalidState` if not `Playing`, or `ReplayError::NoData`
    /// if the reload fails.
    pub async fn set_speed(&self, new_speed: Speed) -> Result<(), ReplayError> {
        if new_speed <= 0 {
            return Err(ReplayError::InvalidSpeed(format!("speed must be positive, got {new_speed}")));
        }
        let new_base_interval = select_base_interval(new_speed).map_err(|e| ReplayError::InvalidSpeed(e.to_string()))?;

        let (symbol, old_base_interval, price_time) = {
            let guard = self.state.lock().await;
            require_state(&guard, ReplayState::Playing, "SetSpeed")?;
            (
                guard.symbol.clone().expect("Playing implies symbol set"),
                guard.base_interval.expect("Playing implies base_interval set"),
                guard.current_price_time.expect("Playing implies current_price_time set"),
            )
        };

        if new_base_interval != old_base_interval {
            let boundary = price_time.floor_to(new_base_interval.duration_millis());
            let margin_ms = REWIND_SAFETY_MARGIN_CANDLES * new_base_interval.duration_millis();
            let from = SimTime::from_millis((boundary.millis() - margin_ms).max(0));
            let request = CandleRequest {
                symbol,
                interval: new_base_interval,
                from,
                to: None,
                limit: BATCH_SIZE,
                allow_incomplete: false,
            };
            let symbol_for_error = request.symbol.to_string();
            let from_for_error = request.from.millis();
            let candles = self.load_candles(request).await.map_err(|_| ReplayError::NoData {
                symbol: symbol_for_error,
                start_time_ms: from_for_error,
            })?;

            let mut guard = self.state.lock().await;
            guard.base_interval = Some(new_base_interval);
            guard.replace_buffer(candles);
            guard.speed = Some(new_speed);
            guard.ticker_interval = Some(ticker_interval(new_speed, new_base_interval));
        } else {
            let mut guard = self.state.lock().await;
            guard.speed = Some(new_speed);
            guard.ticker_interval = Some(ticker_interval(new_speed, new_base_interval));
        }

        self.emit_status_update("speed updated").await;
        Ok(())
    }

    /// `SetTimeframe` (§4.2): validates against `minAllowedDisplay(speed)`;
    /// never changes the base interval.
    ///
    /// # Errors
    ///
    /// Returns `ReplayError::InvalidTimeframe` if narrower than allowed at
    /// the current speed.
    pub async fn set_timeframe(&self, new_display: Interval) -> Result<(), ReplayError> {
        let mut guard = self.state.lock().await;
        let speed = guard.speed.ok_or_else(|| ReplayError::InvalidState {
            operation: "SetTimeframe".to_string(),
            expected: "an active session".to_string(),
            actual: "no session started".to_string(),
        })?;
        validate_timeframe(speed, new_display).map_err(|e| ReplayError::InvalidTimeframe(e.to_string()))?;
        guard.display_interval = Some(new_display);
        drop(guard);
        self.emit_status_update("timeframe updated").await;
        Ok(())
    }

    /// `GetStatus` (§4.2): a consistent snapshot of the session.
    pub async fn get_status(&self) -> StatusSnapshot {
        let guard = self.state.lock().await;
        self.snapshot(&guard)
    }

    /// One emission-loop tick (§4.2): advances `currentSimTime`, executes
    /// and emits every base candle whose `endTime` has been reached, and
    /// triggers a background prefetch once the buffer's consumption crosses
    /// the threshold. A no-op while not `Playing`.
    pub async fn tick(&self) {
        self.drain_prefetch().await;

        let mut guard = self.state.lock().await;
        if guard.state != ReplayState::Playing {
            return;
        }
        let Some(speed) = guard.speed else { return };
        let Some(base_interval) = guard.base_interval else { return };
        let Some(current) = guard.current_sim_time else { return };
        // One real tick, spaced `ticker_interval` apart, advances simulated
        // time by exactly one base candle's duration (§4.2): the caller
        // paces *when* tick() runs, not how far it advances.
        guard.current_sim_time = Some(current + base_interval.duration_millis());
        let horizon = guard.current_sim_time.expect("just set");
        let Some(symbol) = guard.symbol.clone() else { return };

        loop {
            let Some(candle) = guard.next_candle().copied() else { break };
            if candle.end_time > horizon {
                break;
            }
            let price = Price::from_f64(candle.close);
            guard.current_price = Some(price);
            guard.current_price_time = Some(candle.end_time);
            guard.current_index += 1;

            drop(guard);
            self.order_engine.process_price_update(&symbol, price, candle.end_time).await;
            self.sender.try_send(ClientMessage::SimulationUpdate {
                symbol: symbol.clone(),
                base_candle: candle,
                simulation_time: candle.end_time,
                progress: None,
                state: ReplayState::Playing.as_tag().to_string(),
                speed,
            });
            guard = self.state.lock().await;
        }

        if guard.should_prefetch() {
            guard.is_loading_data = true;
            self.spawn_prefetch(&guard);
        }
        guard.trim_buffer();

        if guard.is_exhausted() {
            let at = guard.current_sim_time.unwrap_or(SimTime::from_millis(0));
            drop(guard);
            self.complete(at).await;
        }
    }

    async fn complete(&self, at: SimTime) {
        let simulation_id = {
            let guard = self.state.lock().await;
            guard.current_simulation_id.clone()
        };
        let total_value = {
            let guard = self.state.lock().await;
            self.portfolio_value(&guard).await.unwrap_or(Price::ZERO)
        };
        if let Some(simulation_id) = simulation_id {
            if let Ok(Some(mut record)) = self.simulations.find(&simulation_id).await {
                if record.complete(at, total_value).is_ok() {
                    let _ = self.simulations.update(&record).await;
                }
            }
        }
        let mut guard = self.state.lock().await;
        guard.state = ReplayState::Stopped;
        drop(guard);
        self.emit_status_update("end of data").await;
    }

    fn spawn_prefetch(&self, guard: &SessionState) {
        let Some(symbol) = guard.symbol.clone() else { return };
        let Some(base_interval) = guard.base_interval else { return };
        let from = guard.last_loaded_end_time.map_or(SimTime::from_millis(0), |t| t + 1);
        let candle_source = Arc::clone(&self.candle_source);
        let tx = self.prefetch_tx.clone();
        let request = CandleRequest {
            symbol,
            interval: base_interval,
            from,
            to: None,
            limit: BATCH_SIZE,
            allow_incomplete: false,
        };
        let breaker_permitted = self.candle_source_breaker.is_call_permitted();
        tokio::spawn(async move {
            let message = if breaker_permitted {
                match retry_candle_source_load(|| candle_source.fetch(request.clone())).await {
                    Ok(candles) => PrefetchOutcome::Loaded(candles),
                    Err(err) => PrefetchOutcome::Failed(err.to_string()),
                }
            } else {
                PrefetchOutcome::Failed("candle source circuit breaker is open".to_string())
            };
            let _ = tx.send(message);
        });
    }

    async fn drain_prefetch(&self) {
        let mut rx = self.prefetch_rx.lock().await;
        while let Ok(outcome) = rx.try_recv() {
            let mut guard = self.state.lock().await;
            guard.is_loading_data = false;
            match outcome {
                PrefetchOutcome::Loaded(candles) => {
                    self.candle_source_breaker.record_success();
                    guard.append_batch(candles);
                }
                PrefetchOutcome::Failed(message) => {
                    self.candle_source_breaker.record_failure();
                    self.sender.try_send(ClientMessage::Error {
                        message: format!("candle source prefetch failed: {message}"),
                        error: "candle_source_unavailable".to_string(),
                    });
                }
            }
        }
    }

    async fn portfolio_value(&self, guard: &SessionState) -> Result<Price, PersistenceError> {
        let Some(simulation_id) = guard.current_simulation_id.clone() else {
            return Ok(Price::ZERO);
        };
        let mark_price = guard.current_price.unwrap_or(Price::ZERO);
        let positions = self.positions.find_by_simulation(&simulation_id).await?;
        let total = positions.iter().fold(Decimal::ZERO, |acc, position| acc + position.value_at(mark_price).amount());
        Ok(Price::new(total))
    }

    async fn persist_transition(
        &self,
        guard: &mut SessionState,
        apply: impl FnOnce(&mut SimulationRecord, SimTime) -> Result<(), crate::domain::shared::DomainError>,
    ) -> Result<(), ReplayError> {
        let Some(simulation_id) = guard.current_simulation_id.clone() else {
            return Err(ReplayError::InvalidState {
                operation: "transition".to_string(),
                expected: "an active simulation".to_string(),
                actual: "none".to_string(),
            });
        };
        let at = guard.current_sim_time.unwrap_or(SimTime::from_millis(0));
        let mut record = self
            .simulations
            .find(&simulation_id)
            .await
            .map_err(replay_persistence_error)?
            .ok_or_else(|| ReplayError::InvalidState {
                operation: "transition".to_string(),
                expected: "a persisted Simulation Record".to_string(),
                actual: "not found".to_string(),
            })?;
        apply(&mut record, at).map_err(|e| ReplayError::InvalidState {
            operation: "transition".to_string(),
            expected: "a legal status transition".to_string(),
            actual: e.to_string(),
        })?;
        self.simulations.update(&record).await.map_err(replay_persistence_error)?;
        Ok(())
    }

    fn snapshot(&self, guard: &SessionState) -> StatusSnapshot {
        StatusSnapshot {
            state: guard.state.as_tag().to_string(),
            symbol: guard.symbol.clone(),
            display_interval: guard.display_interval,
            base_interval: guard.base_interval,
            speed: guard.speed,
            start_time: guard.start_time,
            current_sim_time: guard.current_sim_time,
            current_price_time: guard.current_price_time,
            current_price: guard.current_price,
            current_simulation_id: guard.current_simulation_id.clone(),
            is_running: guard.state == ReplayState::Playing,
            progress: None,
        }
    }

    async fn emit_status_update(&self, message: &str) {
        let guard = self.state.lock().await;
        let status = self.snapshot(&guard);
        drop(guard);
        self.sender.try_send(ClientMessage::StatusUpdate {
            status,
            message: message.to_string(),
        });
    }
}

fn require_state(guard: &SessionState, expected: ReplayState, operation: &str) -> Result<(), ReplayError> {
    if guard.state != expected {
        return Err(ReplayError::InvalidState {
            operation: operation.to_string(),
            expected: expected.as_tag().to_string(),
            actual: guard.state.as_tag().to_string(),
        });
    }
    Ok(())
}

fn replay_persistence_error(err: PersistenceError) -> ReplayError {
    ReplayError::InvalidState {
        operation: "persistence".to_string(),
        expected: "a successful DAO operation".to_string(),
        actual: err.to_string(),
    }
}
