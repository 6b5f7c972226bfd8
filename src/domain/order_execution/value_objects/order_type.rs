//! Order type: market orders execute immediately, limit orders rest in the
//! Order Book until the market crosses their trigger price.

use serde::{Deserialize, Serialize};

/// How an order's execution price is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Executes immediately against the current price.
    Market,
    /// Rests in the Order Book until the market price crosses `limitPrice`.
    Limit,
}

impl OrderType {
    /// Limit orders must carry a `limitPrice`; market orders must not rely
    /// on one.
    #[must_use]
    pub const fn requires_limit_price(self) -> bool {
        matches!(self, Self::Limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_limit_requires_limit_price() {
        assert!(OrderType::Limit.requires_limit_price());
        assert!(!OrderType::Market.requires_limit_price());
    }
}
