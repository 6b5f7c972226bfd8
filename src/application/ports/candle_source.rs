//! Candle Source Port (Driven Port, §6).
//!
//! The historical data source adapter is out of scope for this crate
//! (§1); this trait is the seam a real implementation plugs into.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::candle::{Candle, Interval};
use crate::domain::shared::{SimTime, Symbol};

/// A request for an ordered batch of candles.
#[derive(Debug, Clone)]
pub struct CandleRequest {
    /// Traded symbol.
    pub symbol: Symbol,
    /// Candle granularity.
    pub interval: Interval,
    /// Inclusive lower bound on `startTime`.
    pub from: SimTime,
    /// Optional inclusive upper bound.
    pub to: Option<SimTime>,
    /// Maximum number of candles to return.
    pub limit: u32,
    /// When true, the source may synthesize a trailing incomplete candle
    /// from finer-grained data so `to` is not rounded down.
    pub allow_incomplete: bool,
}

/// Failure modes a Candle Source can report.
#[derive(Debug, Clone, Error)]
pub enum CandleSourceError {
    /// The source is temporarily unreachable or errored transiently.
    #[error("candle source unavailable: {0}")]
    Unavailable(String),

    /// The requested symbol is not recognized by the source.
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
}

/// Port for fetching historical OHLCV candles.
#[async_trait]
pub trait CandleSourcePort: Send + Sync {
    /// Fetch an ordered sequence of candles satisfying `request`.
    ///
    /// # Errors
    ///
    /// Returns `CandleSourceError` if the source cannot serve the request.
    async fn fetch(&self, request: CandleRequest) -> Result<Vec<Candle>, CandleSourceError>;
}
