//! In-memory Candle Source adapter.
//!
//! Generates a deterministic synthetic OHLCV series per symbol so the
//! engine is runnable and testable standalone (§1 treats the real
//! historical-data source as an external collaborator). Not for
//! production use.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::application::ports::{CandleRequest, CandleSourceError, CandleSourcePort};
use crate::domain::candle::{Candle, Interval};
use crate::domain::shared::SimTime;

/// A deterministic, seedable price path for one symbol.
#[derive(Debug, Clone)]
pub struct SyntheticSeries {
    /// Price at `startTime`.
    pub starting_price: f64,
    /// Per-base-minute drift, applied multiplicatively.
    pub drift_per_minute: f64,
    /// Amplitude of a deterministic sine-wave oscillation layered on drift.
    pub oscillation_amplitude: f64,
}

impl Default for SyntheticSeries {
    fn default() -> Self {
        Self {
            starting_price: 100.0,
            drift_per_minute: 0.0001,
            oscillation_amplitude: 0.5,
        }
    }
}

/// In-memory `CandleSourcePort` backed by a synthetic series per symbol.
///
/// Unknown symbols are rejected with `CandleSourceError::UnknownSymbol`;
/// registering a symbol with `register` is required before `fetch` will
/// serve it.
#[derive(Debug, Default)]
pub struct InMemoryCandleSource {
    series: RwLock<HashMap<String, SyntheticSeries>>,
}

impl InMemoryCandleSource {
    /// Create a source with no symbols registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a symbol with a synthetic price path. Subsequent `fetch`
    /// calls for this symbol succeed.
    pub fn register(&self, symbol: &str, series: SyntheticSeries) {
        let mut guard = self.series.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.insert(symbol.to_uppercase(), series);
    }

    fn synthesize(series: &SyntheticSeries, interval: Interval, from: SimTime, limit: u32) -> Vec<Candle> {
        let duration = interval.duration_millis();
        let mut candles = Vec::with_capacity(limit as usize);
        let base_start = from.millis() - (from.millis() % duration).max(0);
        for i in 0..i64::from(limit) {
            let start = SimTime::from_millis(base_start + i * duration);
            let end = SimTime::from_millis(start.millis() + duration - 1);
            let minute_index = i as f64 * (duration as f64 / 60_000.0);
            let drift = (1.0 + series.drift_per_minute).powf(minute_index);
            let oscillation = (minute_index / 15.0).sin() * series.oscillation_amplitude;
            let open = series.starting_price * drift + oscillation;
            let close = series.starting_price * drift * (1.0 + series.drift_per_minute) + oscillation;
            let high = open.max(close) + series.oscillation_amplitude.abs() * 0.1;
            let low = open.min(close) - series.oscillation_amplitude.abs() * 0.1;
            candles.push(Candle::new(start, end, open, high, low, close, 1_000.0, true));
        }
        candles
    }
}

#[async_trait]
impl CandleSourcePort for InMemoryCandleSource {
    async fn fetch(&self, request: CandleRequest) -> Result<Vec<Candle>, CandleSourceError> {
        let guard = self.series.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let series = guard
            .get(request.symbol.as_str())
            .ok_or_else(|| CandleSourceError::UnknownSymbol(request.symbol.to_string()))?;
        Ok(Self::synthesize(series, request.interval, request.from, request.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::Symbol;

    #[tokio::test]
    async fn fetch_rejects_unregistered_symbol() {
        let source = InMemoryCandleSource::new();
        let request = CandleRequest {
            symbol: Symbol::new("BTC"),
            interval: Interval::OneMinute,
            from: SimTime::from_millis(0),
            to: None,
            limit: 10,
            allow_incomplete: false,
        };
        let result = source.fetch(request).await;
        assert!(matches!(result, Err(CandleSourceError::UnknownSymbol(_))));
    }

    #[tokio::test]
    async fn fetch_returns_requested_count_in_order() {
        let source = InMemoryCandleSource::new();
        source.register("BTC", SyntheticSeries::default());
        let request = CandleRequest {
            symbol: Symbol::new("BTC"),
            interval: Interval::OneMinute,
            from: SimTime::from_millis(0),
            to: None,
            limit: 50,
            allow_incomplete: false,
        };
        let candles = source.fetch(request).await.unwrap();
        assert_eq!(candles.len(), 50);
        for window in candles.windows(2) {
            assert!(window[1].start_time > window[0].start_time);
            assert_eq!(window[0].end_time.millis() + 1, window[1].start_time.millis());
        }
    }

    #[tokio::test]
    async fn fetch_is_deterministic_for_the_same_request() {
        let source = InMemoryCandleSource::new();
        source.register("BTC", SyntheticSeries::default());
        let request = CandleRequest {
            symbol: Symbol::new("BTC"),
            interval: Interval::OneMinute,
            from: SimTime::from_millis(0),
            to: None,
            limit: 20,
            allow_incomplete: false,
        };
        let first = source.fetch(request.clone()).await.unwrap();
        let second = source.fetch(request).await.unwrap();
        assert_eq!(first, second);
    }
}
