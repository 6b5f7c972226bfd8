//! Trade aggregate: the record of a single order fill.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::aggregate::Order;
use crate::domain::shared::{OrderId, Price, Quantity, SimTime, SimulationId, Symbol, TradeId, UserId};

/// Flat proportional fee rate applied to every fill (§4.3): 0.1%.
pub const FEE_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 3);

/// A single order fill. No partial fills in scope: `quantity` always equals
/// the filled order's full requested quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique identifier.
    pub id: TradeId,
    /// The order this trade fills.
    pub order_id: OrderId,
    /// Owning user.
    pub user_id: UserId,
    /// Owning simulation.
    pub simulation_id: SimulationId,
    /// Traded symbol.
    pub symbol: Symbol,
    /// Quote-side asset.
    pub base_currency: Symbol,
    /// Buy or sell, inherited from the order.
    pub side: crate::domain::order_execution::value_objects::OrderSide,
    /// Filled quantity.
    pub quantity: Quantity,
    /// Execution price: the current market price, not the limit trigger.
    pub price: Price,
    /// Fee charged on this fill: `quantity * price * FEE_RATE`.
    pub fee: Price,
    /// Simulation time of execution.
    pub executed_at: SimTime,
}

impl Trade {
    /// Derive a trade from an order that has just executed at `price`.
    ///
    /// The caller is responsible for having already called
    /// `order.mark_executed(price, at)`; this only reads the order's fields.
    #[must_use]
    pub fn from_executed_order(order: &Order, price: Price, at: SimTime) -> Self {
        let fee = Price::new(order.quantity.amount() * price.amount() * FEE_RATE);
        Self {
            id: TradeId::generate(),
            order_id: order.id.clone(),
            user_id: order.user_id.clone(),
            simulation_id: order.simulation_id.clone(),
            symbol: order.symbol.clone(),
            base_currency: order.base_currency.clone(),
            side: order.side,
            quantity: order.quantity,
            price,
            fee,
            executed_at: at,
        }
    }

    /// Net cash impact of this trade on the cash position: negative for a
    /// buy (cash spent plus fee), positive for a sell (cash received minus
    /// fee).
    #[must_use]
    pub fn cash_delta(&self) -> Decimal {
        let notional = self.quantity.amount() * self.price.amount();
        match self.side {
            crate::domain::order_execution::value_objects::OrderSide::Buy => -(notional + self.fee.amount()),
            crate::domain::order_execution::value_objects::OrderSide::Sell => notional - self.fee.amount(),
        }
    }

    /// Signed change to the symbol position's quantity: `+quantity` for a
    /// buy, `-quantity` for a sell.
    #[must_use]
    pub fn symbol_quantity_delta(&self) -> Decimal {
        match self.side {
            crate::domain::order_execution::value_objects::OrderSide::Buy => self.quantity.amount(),
            crate::domain::order_execution::value_objects::OrderSide::Sell => -self.quantity.amount(),
        }
    }
}
