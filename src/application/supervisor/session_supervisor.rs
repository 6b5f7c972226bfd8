//! Session Supervisor (§2, §5): one worker per client connection owning a
//! `ReplayEngine` + `OrderExecutionEngine` pair, driving the tick loop and
//! routing control messages, torn down on disconnect.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::application::messages::ClientMessage;
use crate::application::order_execution::OrderExecutionEngine;
use crate::application::ports::{CandleSourcePort, ClientSenderPort, OrderRepository, PositionRepository, SimulationRepository, TradeRepository};
use crate::application::replay::{ReplayEngine, DEFAULT_BASE_CURRENCY};
use crate::application::ControlMessage;
use crate::domain::order_execution::value_objects::{OrderSide, OrderType};
use crate::domain::order_execution::OrderError;
use crate::domain::shared::{Price, Quantity, SimTime, Symbol, UserId};
use crate::domain::simulation::ReplayError;

/// Failure surfaced by a single control-message dispatch. Always
/// translated into a client-visible `error` message (§7): nothing here
/// closes the transport.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SupervisorError {
    /// The Replay Engine rejected a simulation-control command.
    #[error(transparent)]
    Replay(#[from] ReplayError),

    /// The Order Execution Engine rejected an order command.
    #[error(transparent)]
    Order(#[from] OrderError),
}

/// One client session's supervising worker (§5: "each client session owns
/// one cooperative worker that drives the emission loop and processes
/// control inputs").
pub struct SessionSupervisor<Cs, Sim, O, T, P, Snd>
where
    Cs: CandleSourcePort + 'static,
    Sim: SimulationRepository,
    O: OrderRepository,
    T: TradeRepository,
    P: PositionRepository,
    Snd: ClientSenderPort,
{
    replay: Arc<ReplayEngine<Cs, Sim, O, T, P, Snd>>,
    order_engine: Arc<OrderExecutionEngine<O, T, P, Snd>>,
    sender: Arc<Snd>,
    user_id: UserId,
}

impl<Cs, Sim, O, T, P, Snd> SessionSupervisor<Cs, Sim, O, T, P, Snd>
where
    Cs: CandleSourcePort + 'static,
    Sim: SimulationRepository + 'static,
    O: OrderRepository + 'static,
    T: TradeRepository + 'static,
    P: PositionRepository + 'static,
    Snd: ClientSenderPort + 'static,
{
    /// Construct a supervisor for one client connection, wiring a fresh
    /// Replay Engine and Order Execution Engine over the shared adapters.
    #[must_use]
    pub fn new(
        candle_source: Arc<Cs>,
        simulations: Arc<Sim>,
        orders: Arc<O>,
        trades: Arc<T>,
        positions: Arc<P>,
        sender: Arc<Snd>,
        user_id: UserId,
    ) -> Self {
        let order_engine = Arc::new(OrderExecutionEngine::new(
            Arc::clone(&orders),
            Arc::clone(&trades),
            Arc::clone(&positions),
            Arc::clone(&sender),
        ));
        let replay = Arc::new(ReplayEngine::new(
            candle_source,
            simulations,
            positions,
            Arc::clone(&sender),
            Arc::clone(&order_engine),
            user_id.clone(),
        ));
        sender.try_send(ClientMessage::ConnectionStatus {
            message: "connected".to_string(),
        });
        Self {
            replay,
            order_engine,
            sender,
            user_id,
        }
    }

    /// Run the cooperative worker loop until `disconnect` fires: drain
    /// control messages as they arrive and tick the Replay Engine on a
    /// `tokio::time::interval` paced at the session's current
    /// `tickerInterval`. The interval is rebuilt whenever the pace changes
    /// (e.g. `SetSpeed`), since a session starts with no pace at all (§5).
    pub async fn run(&self, mut control_rx: mpsc::UnboundedReceiver<ControlMessage>, mut disconnect: mpsc::Receiver<()>) {
        loop {
            let mut ticker = tokio::time::interval(self.next_tick_delay().await);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            tokio::select! {
                _ = disconnect.recv() => break,
                maybe_msg = control_rx.recv() => {
                    match maybe_msg {
                        Some(msg) => self.handle_control(msg).await,
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    self.replay.tick().await;
                }
            }
        }
    }

    async fn next_tick_delay(&self) -> std::time::Duration {
        let status = self.replay.get_status().await;
        status
            .speed
            .zip(status.base_interval)
            .map_or(std::time::Duration::from_millis(100), |(speed, base_interval)| {
                crate::domain::simulation::ticker_interval(speed, base_interval)
            })
    }

    /// Dispatch one control message to the owning engine, surfacing any
    /// failure as an `error` message rather than propagating it (§7).
    pub async fn handle_control(&self, message: ControlMessage) {
        if let Err(err) = self.dispatch(message).await {
            self.sender.try_send(ClientMessage::Error {
                message: err.to_string(),
                error: error_tag(&err).to_string(),
            });
        }
    }

    async fn dispatch(&self, message: ControlMessage) -> Result<(), SupervisorError> {
        match message {
            ControlMessage::SimulationControlStart {
                symbol,
                start_time,
                interval,
                speed,
                initial_funding,
            } => {
                self.replay.start(symbol, interval, start_time, speed, initial_funding).await?;
            }
            ControlMessage::SimulationControlStop => self.replay.stop().await?,
            ControlMessage::SimulationControlPause => self.replay.pause().await?,
            ControlMessage::SimulationControlResume => self.replay.resume().await?,
            ControlMessage::SimulationControlGetStatus => {
                let status = self.replay.get_status().await;
                self.sender.try_send(ClientMessage::StatusUpdate {
                    status,
                    message: "status requested".to_string(),
                });
            }
            ControlMessage::SimulationControlSetSpeed { speed } => self.replay.set_speed(speed).await?,
            ControlMessage::SimulationControlSetTimeframe { timeframe } => {
                self.replay.set_timeframe(timeframe).await?;
            }
            ControlMessage::OrderPlace {
                symbol,
                side,
                order_type,
                quantity,
                limit_price,
            } => self.dispatch_order_place(symbol, side, order_type, quantity, limit_price).await?,
            ControlMessage::OrderCancel { order_id } => {
                self.order_engine.cancel_order(&order_id).await?;
            }
        }
        Ok(())
    }

    async fn dispatch_order_place(
        &self,
        symbol: Symbol,
        side: OrderSide,
        order_type: OrderType,
        quantity: Quantity,
        limit_price: Option<Price>,
    ) -> Result<(), SupervisorError> {
        let status = self.replay.get_status().await;
        let user_id = self.user_id.clone();
        let simulation_id = status.current_simulation_id.clone().ok_or_else(|| {
            SupervisorError::Order(OrderError::InvalidParameters {
                field: "simulationId".to_string(),
                message: "no simulation is currently running".to_string(),
            })
        })?;
        // The order book is partitioned per symbol (§4.4) and only the
        // session's own replayed symbol ever advances a price through
        // `ProcessPriceUpdate` (§4.3); an order placed for any other symbol
        // would rest forever (market) or never observe a trigger (limit).
        match &status.symbol {
            Some(active_symbol) if *active_symbol == symbol => {}
            _ => {
                return Err(SupervisorError::Order(OrderError::InvalidParameters {
                    field: "symbol".to_string(),
                    message: format!("order symbol '{symbol}' does not match the session's active replay symbol"),
                }));
            }
        }
        let base_currency = Symbol::new(DEFAULT_BASE_CURRENCY);
        let simulation_time = status.current_sim_time.unwrap_or(SimTime::from_millis(0));

        match order_type {
            OrderType::Market => {
                let current_price = status.current_price.ok_or_else(|| {
                    SupervisorError::Order(OrderError::InvalidParameters {
                        field: "currentPrice".to_string(),
                        message: "no price observed yet this session".to_string(),
                    })
                })?;
                self.order_engine
                    .execute_market_order(user_id, simulation_id, symbol, base_currency, side, quantity, current_price, simulation_time)
                    .await?;
            }
            OrderType::Limit => {
                let limit_price = limit_price.ok_or_else(|| {
                    SupervisorError::Order(OrderError::InvalidParameters {
                        field: "limitPrice".to_string(),
                        message: "limit orders require a limit price".to_string(),
                    })
                })?;
                self.order_engine
                    .place_limit_order(user_id, simulation_id, symbol, base_currency, side, quantity, limit_price, simulation_time)
                    .await?;
            }
        }
        Ok(())
    }
}

fn error_tag(err: &SupervisorError) -> &'static str {
    match err {
        SupervisorError::Replay(ReplayError::AlreadyRunning(_)) => "already_running",
        SupervisorError::Replay(ReplayError::InvalidSpeed(_)) => "invalid_speed",
        SupervisorError::Replay(ReplayError::InvalidTimeframe(_)) => "invalid_timeframe",
        SupervisorError::Replay(ReplayError::NoData { .. }) => "no_data",
        SupervisorError::Replay(ReplayError::InvalidState { .. }) => "invalid_state",
        SupervisorError::Order(OrderError::InvalidParameters { .. }) => "invalid_parameters",
        SupervisorError::Order(OrderError::InsufficientFunds { .. }) => "insufficient_funds",
        SupervisorError::Order(OrderError::InsufficientPosition { .. }) => "insufficient_position",
        SupervisorError::Order(OrderError::InvalidStatus { .. }) => "invalid_status",
        SupervisorError::Order(OrderError::NotFound(_)) => "order_not_found",
        SupervisorError::Order(OrderError::PersistenceFailure { .. }) => "persistence_failure",
    }
}
