//! Order lifecycle status.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// `pending` is the only non-terminal status: every order ends its life as
/// exactly one of `executed`, `cancelled`, or `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Awaiting execution (limit orders resting in the book, or a market
    /// order mid-transaction).
    Pending,
    /// Filled; carries `executedAt`/`executedPrice` on the order.
    Executed,
    /// Cancelled by client request before execution.
    Cancelled,
    /// Rejected validation or a downstream failure prevented execution.
    Failed,
}

impl OrderStatus {
    /// Whether an order in this status can still be cancelled or matched.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether this status is terminal (no further transitions possible).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !self.is_pending()
    }
}
