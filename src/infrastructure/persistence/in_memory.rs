//! In-memory persistence adapters.
//!
//! Suitable for testing, development, and running the engine standalone
//! (§1 treats the real persistence layer as an external collaborator). Not
//! for production use: nothing here survives a process restart.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::application::ports::{
    OrderRepository, PersistenceError, PositionRepository, SimulationRepository, TradeRepository,
};
use crate::domain::order_execution::{Order, Position, Trade};
use crate::domain::shared::{OrderId, Price, SimulationId, Symbol, UserId};
use crate::domain::simulation::SimulationRecord;

/// In-memory `SimulationRepository`.
#[derive(Debug, Default)]
pub struct InMemorySimulationRepository {
    records: RwLock<HashMap<String, SimulationRecord>>,
}

impl InMemorySimulationRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SimulationRepository for InMemorySimulationRepository {
    async fn create(&self, record: SimulationRecord) -> Result<(), PersistenceError> {
        let mut records = self.records.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        records.insert(record.id.as_str().to_string(), record);
        Ok(())
    }

    async fn update(&self, record: &SimulationRecord) -> Result<(), PersistenceError> {
        let mut records = self.records.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        records.insert(record.id.as_str().to_string(), record.clone());
        Ok(())
    }

    async fn find(&self, id: &SimulationId) -> Result<Option<SimulationRecord>, PersistenceError> {
        let records = self.records.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(records.get(id.as_str()).cloned())
    }
}

/// In-memory `OrderRepository`.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
}

impl InMemoryOrderRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: &Order) -> Result<(), PersistenceError> {
        let mut orders = self.orders.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        orders.insert(order.id.as_str().to_string(), order.clone());
        Ok(())
    }

    async fn update(&self, order: &Order) -> Result<(), PersistenceError> {
        let mut orders = self.orders.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        if !orders.contains_key(order.id.as_str()) {
            return Err(PersistenceError::NotFound {
                entity: "Order".to_string(),
                id: order.id.to_string(),
            });
        }
        orders.insert(order.id.as_str().to_string(), order.clone());
        Ok(())
    }

    async fn find(&self, id: &OrderId) -> Result<Option<Order>, PersistenceError> {
        let orders = self.orders.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(orders.get(id.as_str()).cloned())
    }

    async fn find_pending_limit_orders(&self, simulation_id: &SimulationId) -> Result<Vec<Order>, PersistenceError> {
        let orders = self.orders.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(orders
            .values()
            .filter(|o| {
                &o.simulation_id == simulation_id
                    && o.order_type == crate::domain::order_execution::value_objects::OrderType::Limit
                    && o.status == crate::domain::order_execution::value_objects::OrderStatus::Pending
            })
            .cloned()
            .collect())
    }
}

/// In-memory `TradeRepository`.
#[derive(Debug, Default)]
pub struct InMemoryTradeRepository {
    trades: RwLock<Vec<Trade>>,
}

impl InMemoryTradeRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TradeRepository for InMemoryTradeRepository {
    async fn create(&self, trade: &Trade) -> Result<(), PersistenceError> {
        let mut trades = self.trades.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        trades.push(trade.clone());
        Ok(())
    }

    async fn find_by_simulation(&self, simulation_id: &SimulationId) -> Result<Vec<Trade>, PersistenceError> {
        let trades = self.trades.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(trades
            .iter()
            .filter(|t| &t.simulation_id == simulation_id)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PositionKey {
    user_id: String,
    simulation_id: String,
    symbol: String,
    base_currency: String,
}

impl PositionKey {
    fn of(user_id: &UserId, simulation_id: &SimulationId, symbol: &Symbol, base_currency: &Symbol) -> Self {
        Self {
            user_id: user_id.to_string(),
            simulation_id: simulation_id.to_string(),
            symbol: symbol.as_str().to_string(),
            base_currency: base_currency.as_str().to_string(),
        }
    }
}

/// In-memory `PositionRepository`.
///
/// Keying by `(userId, simulationId, symbol, baseCurrency)` in a `HashMap`
/// enforces the uniqueness invariant (§3, §8 invariant 6) structurally:
/// the map can hold at most one entry per key.
#[derive(Debug, Default)]
pub struct InMemoryPositionRepository {
    positions: RwLock<HashMap<PositionKey, Position>>,
}

impl InMemoryPositionRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PositionRepository for InMemoryPositionRepository {
    async fn find(
        &self,
        user_id: &UserId,
        simulation_id: &SimulationId,
        symbol: &Symbol,
        base_currency: &Symbol,
    ) -> Result<Option<Position>, PersistenceError> {
        let positions = self.positions.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(positions
            .get(&PositionKey::of(user_id, simulation_id, symbol, base_currency))
            .cloned())
    }

    async fn find_by_simulation(&self, simulation_id: &SimulationId) -> Result<Vec<Position>, PersistenceError> {
        let positions = self.positions.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(positions
            .values()
            .filter(|p| &p.simulation_id == simulation_id)
            .cloned()
            .collect())
    }

    async fn create(&self, position: Position) -> Result<(), PersistenceError> {
        let mut positions = self.positions.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let key = PositionKey::of(&position.user_id, &position.simulation_id, &position.symbol, &position.base_currency);
        positions.insert(key, position);
        Ok(())
    }

    async fn update_or_create_position(
        &self,
        user_id: &UserId,
        simulation_id: &SimulationId,
        symbol: &Symbol,
        base_currency: &Symbol,
        delta_qty: Decimal,
        execution_price: Price,
        _fee: Price,
    ) -> Result<Position, PersistenceError> {
        let mut positions = self.positions.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let key = PositionKey::of(user_id, simulation_id, symbol, base_currency);
        let position = positions.entry(key).or_insert_with(|| {
            Position::new_empty(user_id.clone(), simulation_id.clone(), symbol.clone(), base_currency.clone())
        });
        position.apply_delta(delta_qty, execution_price.amount());
        Ok(position.clone())
    }
}
