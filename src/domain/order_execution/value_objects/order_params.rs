//! Order parameters: a small flexible bag of order-type-specific settings.

use serde::{Deserialize, Serialize};

use crate::domain::shared::Price;

/// Order-type-specific parameters.
///
/// Modeled as a flexible struct rather than a closed enum so that future
/// order types can add fields without breaking persisted rows; today only
/// `limitPrice` (required for limit orders) is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderParams {
    /// The trigger price for a limit order. `None` for market orders.
    #[serde(rename = "limitPrice", skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<Price>,
}

impl OrderParams {
    /// Parameters for a market order: no limit price.
    #[must_use]
    pub const fn market() -> Self {
        Self { limit_price: None }
    }

    /// Parameters for a limit order.
    #[must_use]
    pub const fn limit(limit_price: Price) -> Self {
        Self {
            limit_price: Some(limit_price),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_has_no_limit_price() {
        assert_eq!(OrderParams::market().limit_price, None);
    }

    #[test]
    fn limit_carries_limit_price() {
        let params = OrderParams::limit(Price::from_f64(100.0));
        assert_eq!(params.limit_price, Some(Price::from_f64(100.0)));
    }

    #[test]
    fn serde_omits_limit_price_when_absent() {
        let json = serde_json::to_string(&OrderParams::market()).unwrap();
        assert_eq!(json, "{}");
    }
}
