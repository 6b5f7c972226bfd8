//! Order side: which direction of the market an order trades.

use serde::{Deserialize, Serialize};

/// Which direction an order trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Acquire the symbol, spending base currency.
    Buy,
    /// Dispose of the symbol, receiving base currency.
    Sell,
}

impl OrderSide {
    /// A buy limit fires when the market price falls to or below the limit;
    /// a sell limit fires when it rises to or above it.
    #[must_use]
    pub fn limit_eligible(self, market_price: rust_decimal::Decimal, limit_price: rust_decimal::Decimal) -> bool {
        match self {
            Self::Buy => market_price <= limit_price,
            Self::Sell => market_price >= limit_price,
        }
    }
}
