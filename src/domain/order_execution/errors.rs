//! Order Execution Engine failure modes.

use thiserror::Error;

use crate::domain::order_execution::value_objects::OrderStatus;
use crate::domain::shared::OrderId;

/// Failure modes surfaced by the Order Execution Engine's public operations.
#[derive(Debug, Clone, Error)]
pub enum OrderError {
    /// A field on the order request failed validation.
    #[error("invalid order parameter '{field}': {message}")]
    InvalidParameters {
        /// Offending field.
        field: String,
        /// Description of the problem.
        message: String,
    },

    /// A buy order's cost plus fee exceeds the available cash position.
    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds {
        /// Amount required (quantity × price + fee).
        required: String,
        /// Amount available in the cash position.
        available: String,
    },

    /// A sell order's quantity exceeds the available symbol position.
    #[error("insufficient position: need {required}, have {available}")]
    InsufficientPosition {
        /// Quantity required.
        required: String,
        /// Quantity available.
        available: String,
    },

    /// An operation was attempted against an order in a status that doesn't
    /// permit it (e.g. cancelling an already-executed order).
    #[error("order {order_id} cannot be {attempted} while {status:?}")]
    InvalidStatus {
        /// The order in question.
        order_id: OrderId,
        /// The status it was found in.
        status: OrderStatus,
        /// The operation that was attempted.
        attempted: String,
    },

    /// The referenced order does not exist.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// A persistence operation failed mid-transaction.
    #[error("persistence failure during {operation}: {message}")]
    PersistenceFailure {
        /// The operation being performed when persistence failed.
        operation: String,
        /// Description of the failure.
        message: String,
    },
}
