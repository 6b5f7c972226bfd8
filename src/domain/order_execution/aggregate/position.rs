//! Position aggregate: a user's holding of one symbol within one
//! simulation, including the cash (base-currency) position itself.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{Price, SimulationId, Symbol, UserId};

/// A position key: `(userId, simulationId, symbol, baseCurrency)`. At most
/// one `Position` row exists per key at any time (§3, §8 invariant 6).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionKey {
    /// Owning user.
    pub user_id: UserId,
    /// Owning simulation.
    pub simulation_id: SimulationId,
    /// Held symbol (equal to `base_currency` for the cash position).
    pub symbol: Symbol,
    /// Quote-side asset the position is valued in.
    pub base_currency: Symbol,
}

/// A user's holding of one symbol (or of cash, when `symbol ==
/// base_currency`) within one simulation.
///
/// Invariant: the cash position always has `average_price == 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Owning user.
    pub user_id: UserId,
    /// Owning simulation.
    pub simulation_id: SimulationId,
    /// Held symbol.
    pub symbol: Symbol,
    /// Quote-side asset.
    pub base_currency: Symbol,
    /// Quantity held (can be negative only for cash, representing margin;
    /// out of scope here since margin is a non-goal — cash is allowed to
    /// reach exactly zero but never below by construction of the funds
    /// check upstream).
    pub quantity: Decimal,
    /// Volume-weighted average entry price. Always `1` for cash.
    pub average_price: Decimal,
    /// Total cost basis: `quantity * average_price` at each buy.
    pub total_cost: Decimal,
}

impl Position {
    /// Key identifying this position for the uniqueness invariant.
    #[must_use]
    pub fn key(&self) -> PositionKey {
        PositionKey {
            user_id: self.user_id.clone(),
            simulation_id: self.simulation_id.clone(),
            symbol: self.symbol.clone(),
            base_currency: self.base_currency.clone(),
        }
    }

    /// Create the initial cash position seeded with `initial_funding`, as
    /// `Start` does (§4.2).
    #[must_use]
    pub fn initial_cash(
        user_id: UserId,
        simulation_id: SimulationId,
        base_currency: Symbol,
        initial_funding: Price,
    ) -> Self {
        Self {
            user_id,
            simulation_id,
            symbol: base_currency.clone(),
            base_currency,
            quantity: initial_funding.amount(),
            average_price: Decimal::ONE,
            total_cost: initial_funding.amount(),
        }
    }

    /// Create a new, empty symbol position (zero quantity, zero cost).
    #[must_use]
    pub fn new_empty(
        user_id: UserId,
        simulation_id: SimulationId,
        symbol: Symbol,
        base_currency: Symbol,
    ) -> Self {
        Self {
            user_id,
            simulation_id,
            symbol,
            base_currency,
            quantity: Decimal::ZERO,
            average_price: Decimal::ZERO,
            total_cost: Decimal::ZERO,
        }
    }

    /// Whether this is the cash (base-currency) position.
    #[must_use]
    pub fn is_cash(&self) -> bool {
        self.symbol == self.base_currency
    }

    /// Apply a quantity delta at `execution_price` (§6
    /// `UpdateOrCreatePosition`): a positive delta (buy-side effect) adds
    /// to the cost basis proportionally and recomputes the average price; a
    /// negative delta (sell-side effect) reduces quantity and cost
    /// proportionally, leaving the average price unchanged.
    pub fn apply_delta(&mut self, delta: Decimal, execution_price: Decimal) {
        if delta.is_sign_positive() {
            let added_cost = delta * execution_price;
            let new_quantity = self.quantity + delta;
            let new_total_cost = self.total_cost + added_cost;
            self.average_price = if new_quantity.is_zero() {
                Decimal::ZERO
            } else {
                new_total_cost / new_quantity
            };
            self.quantity = new_quantity;
            self.total_cost = new_total_cost;
        } else {
            let removed = -delta;
            let new_quantity = self.quantity - removed;
            let proportion = if self.quantity.is_zero() {
                Decimal::ZERO
            } else {
                removed / self.quantity
            };
            self.total_cost -= self.total_cost * proportion;
            self.quantity = new_quantity;
        }
    }

    /// Mark-to-market value of this position at `mark_price` (the cash
    /// position's mark price is always `1`).
    #[must_use]
    pub fn value_at(&self, mark_price: Price) -> Price {
        if self.is_cash() {
            Price::new(self.quantity)
        } else {
            Price::new(self.quantity * mark_price.amount())
        }
    }
}
