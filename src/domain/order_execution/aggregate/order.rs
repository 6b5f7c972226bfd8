//! Order aggregate: a market or limit order placed by one user within one
//! simulation.

use serde::{Deserialize, Serialize};

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::value_objects::{OrderParams, OrderSide, OrderStatus, OrderType};
use crate::domain::shared::{OrderId, Price, Quantity, SimTime, SimulationId, Symbol, UserId};

/// A market or limit order.
///
/// Invariants (§3): an executed order has both `executed_at` and
/// `executed_price` set; a limit order carries a positive `limitPrice` in
/// `order_params`; a market order carries none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier.
    pub id: OrderId,
    /// Owning user.
    pub user_id: UserId,
    /// Owning simulation.
    pub simulation_id: SimulationId,
    /// Traded symbol.
    pub symbol: Symbol,
    /// Quote-side asset the order is denominated in.
    pub base_currency: Symbol,
    /// Buy or sell.
    pub side: OrderSide,
    /// Market or limit.
    pub order_type: OrderType,
    /// Quantity requested. No partial fills in scope: a fill is always for
    /// the full requested quantity.
    pub quantity: Quantity,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Simulation time the order was placed.
    pub placed_at: SimTime,
    /// Simulation time the order executed, once filled.
    pub executed_at: Option<SimTime>,
    /// Price the order executed at, once filled.
    pub executed_price: Option<Price>,
    /// Order-type-specific parameters (`limitPrice` for limit orders).
    pub order_params: OrderParams,
}

impl Order {
    /// Construct a new pending market order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidParameters` if `symbol` is empty or
    /// `quantity` is not strictly positive.
    pub fn new_market(
        user_id: UserId,
        simulation_id: SimulationId,
        symbol: Symbol,
        base_currency: Symbol,
        side: OrderSide,
        quantity: Quantity,
        placed_at: SimTime,
    ) -> Result<Self, OrderError> {
        Self::new(
            user_id,
            simulation_id,
            symbol,
            base_currency,
            side,
            OrderType::Market,
            quantity,
            placed_at,
            OrderParams::market(),
        )
    }

    /// Construct a new pending limit order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidParameters` if `symbol` is empty,
    /// `quantity` is not strictly positive, or `limit_price` is not
    /// strictly positive.
    pub fn new_limit(
        user_id: UserId,
        simulation_id: SimulationId,
        symbol: Symbol,
        base_currency: Symbol,
        side: OrderSide,
        quantity: Quantity,
        limit_price: Price,
        placed_at: SimTime,
    ) -> Result<Self, OrderError> {
        limit_price
            .validate_for_order()
            .map_err(|e| OrderError::InvalidParameters {
                field: "limitPrice".to_string(),
                message: e.to_string(),
            })?;
        Self::new(
            user_id,
            simulation_id,
            symbol,
            base_currency,
            side,
            OrderType::Limit,
            quantity,
            placed_at,
            OrderParams::limit(limit_price),
        )
    }

    fn new(
        user_id: UserId,
        simulation_id: SimulationId,
        symbol: Symbol,
        base_currency: Symbol,
        side: OrderSide,
        order_type: OrderType,
        quantity: Quantity,
        placed_at: SimTime,
        order_params: OrderParams,
    ) -> Result<Self, OrderError> {
        symbol
            .validate()
            .map_err(|e| OrderError::InvalidParameters {
                field: "symbol".to_string(),
                message: e.to_string(),
            })?;
        quantity
            .validate_for_order()
            .map_err(|e| OrderError::InvalidParameters {
                field: "quantity".to_string(),
                message: e.to_string(),
            })?;
        if order_type.requires_limit_price() && order_params.limit_price.is_none() {
            return Err(OrderError::InvalidParameters {
                field: "limitPrice".to_string(),
                message: "limit orders require a limitPrice".to_string(),
            });
        }
        if !order_type.requires_limit_price() && order_params.limit_price.is_some() {
            return Err(OrderError::InvalidParameters {
                field: "limitPrice".to_string(),
                message: "market orders must not carry a limitPrice".to_string(),
            });
        }

        Ok(Self {
            id: OrderId::generate(),
            user_id,
            simulation_id,
            symbol,
            base_currency,
            side,
            order_type,
            quantity,
            status: OrderStatus::Pending,
            placed_at,
            executed_at: None,
            executed_price: None,
            order_params,
        })
    }

    /// This order's resting limit price, if it has one.
    #[must_use]
    pub fn limit_price(&self) -> Option<Price> {
        self.order_params.limit_price
    }

    /// Mark this order executed at `price` and `at`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidStatus` if the order is not currently
    /// `pending`.
    pub fn mark_executed(&mut self, price: Price, at: SimTime) -> Result<(), OrderError> {
        self.require_pending("execute")?;
        self.status = OrderStatus::Executed;
        self.executed_at = Some(at);
        self.executed_price = Some(price);
        Ok(())
    }

    /// Mark this order cancelled.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidStatus` if the order is not currently
    /// `pending`.
    pub fn mark_cancelled(&mut self) -> Result<(), OrderError> {
        self.require_pending("cancel")?;
        self.status = OrderStatus::Cancelled;
        Ok(())
    }

    /// Mark this order failed (a validated order that could not be
    /// persisted or executed for a reason outside the caller's control).
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidStatus` if the order is not currently
    /// `pending`.
    pub fn mark_failed(&mut self) -> Result<(), OrderError> {
        self.require_pending("fail")?;
        self.status = OrderStatus::Failed;
        Ok(())
    }

    fn require_pending(&self, attempted: &str) -> Result<(), OrderError> {
        if !self.status.is_pending() {
            return Err(OrderError::InvalidStatus {
                order_id: self.id.clone(),
                status: self.status,
                attempted: attempted.to_string(),
            });
        }
        Ok(())
    }
}
