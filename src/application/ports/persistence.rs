//! Persistence DAO ports (§6): CRUD on Simulation, Order, Trade, Position,
//! plus the transactional `update_or_create_position` operation.
//!
//! The real persistence layer is out of scope for this crate (§1); these
//! traits are the seam a SQL adapter plugs into. `infrastructure::persistence`
//! ships an in-memory implementation so the engine is runnable standalone.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::order_execution::{Order, Position, Trade};
use crate::domain::shared::{OrderId, Price, SimulationId, Symbol, UserId};
use crate::domain::simulation::SimulationRecord;

/// Failure modes a persistence adapter can report.
#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    /// The transaction could not be committed.
    #[error("transaction failed during {operation}: {message}")]
    TransactionFailed {
        /// The operation in progress when the failure occurred.
        operation: String,
        /// Description of the failure.
        message: String,
    },

    /// The referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity type.
        entity: String,
        /// Identifier searched for.
        id: String,
    },
}

/// DAO for `SimulationRecord` rows.
#[async_trait]
pub trait SimulationRepository: Send + Sync {
    /// Persist a new simulation record.
    async fn create(&self, record: SimulationRecord) -> Result<(), PersistenceError>;

    /// Overwrite an existing simulation record (status transitions).
    async fn update(&self, record: &SimulationRecord) -> Result<(), PersistenceError>;

    /// Fetch a simulation record by id.
    async fn find(&self, id: &SimulationId) -> Result<Option<SimulationRecord>, PersistenceError>;
}

/// DAO for `Order` rows.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a new order.
    async fn create(&self, order: &Order) -> Result<(), PersistenceError>;

    /// Overwrite an existing order (status transitions).
    async fn update(&self, order: &Order) -> Result<(), PersistenceError>;

    /// Fetch an order by id.
    async fn find(&self, id: &OrderId) -> Result<Option<Order>, PersistenceError>;

    /// All currently pending limit orders for a simulation, used by
    /// `LoadPendingOrders` (§4.3) to rebuild the in-memory Order Book.
    async fn find_pending_limit_orders(
        &self,
        simulation_id: &SimulationId,
    ) -> Result<Vec<Order>, PersistenceError>;
}

/// DAO for `Trade` rows.
#[async_trait]
pub trait TradeRepository: Send + Sync {
    /// Persist a new trade.
    async fn create(&self, trade: &Trade) -> Result<(), PersistenceError>;

    /// All trades recorded for a simulation, in execution order.
    async fn find_by_simulation(
        &self,
        simulation_id: &SimulationId,
    ) -> Result<Vec<Trade>, PersistenceError>;
}

/// DAO for `Position` rows, including the transactional upsert (§6).
#[async_trait]
pub trait PositionRepository: Send + Sync {
    /// Fetch the position for `(user_id, simulation_id, symbol,
    /// base_currency)`, if one exists.
    async fn find(
        &self,
        user_id: &UserId,
        simulation_id: &SimulationId,
        symbol: &Symbol,
        base_currency: &Symbol,
    ) -> Result<Option<Position>, PersistenceError>;

    /// All positions held within a simulation (used for portfolio
    /// valuation at pause/stop/complete).
    async fn find_by_simulation(
        &self,
        simulation_id: &SimulationId,
    ) -> Result<Vec<Position>, PersistenceError>;

    /// Insert the initial cash position at `Start`.
    async fn create(&self, position: Position) -> Result<(), PersistenceError>;

    /// Atomically update or create the position keyed by `(user_id,
    /// simulation_id, symbol, base_currency)`: `quantity += delta_qty`,
    /// recomputing `average_price`/`total_cost` for the direction of the
    /// change (buy adds to cost; sell reduces proportionally). `fee` is
    /// accepted for adapters that also want to debit a separate fee
    /// ledger; this engine folds fees into the cash delta instead, so the
    /// default in-memory adapter ignores it here.
    async fn update_or_create_position(
        &self,
        user_id: &UserId,
        simulation_id: &SimulationId,
        symbol: &Symbol,
        base_currency: &Symbol,
        delta_qty: Decimal,
        execution_price: Price,
        fee: Price,
    ) -> Result<Position, PersistenceError>;
}
