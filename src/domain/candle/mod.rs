//! Candle and Interval: the OHLCV time-series building blocks shared by the
//! Replay Engine, the Order Execution Engine, and the Display Aggregator.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::{DomainError, SimTime};

/// A recognized candle granularity.
///
/// The engine only ever fetches and emits candles at one of these; a source
/// may support finer granularities internally (used to synthesize an
/// incomplete trailing candle), but the engine's own buffer and emission
/// loop operate exclusively on this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    /// One minute.
    #[serde(rename = "1m")]
    OneMinute,
    /// Five minutes.
    #[serde(rename = "5m")]
    FiveMinutes,
    /// Fifteen minutes.
    #[serde(rename = "15m")]
    FifteenMinutes,
    /// One hour.
    #[serde(rename = "1h")]
    OneHour,
    /// Four hours.
    #[serde(rename = "4h")]
    FourHours,
    /// One day.
    #[serde(rename = "1d")]
    OneDay,
}

impl Interval {
    /// All recognized intervals, ascending by duration.
    pub const ALL: [Self; 6] = [
        Self::OneMinute,
        Self::FiveMinutes,
        Self::FifteenMinutes,
        Self::OneHour,
        Self::FourHours,
        Self::OneDay,
    ];

    /// Duration of one candle at this interval, in milliseconds.
    #[must_use]
    pub const fn duration_millis(self) -> i64 {
        match self {
            Self::OneMinute => 60_000,
            Self::FiveMinutes => 5 * 60_000,
            Self::FifteenMinutes => 15 * 60_000,
            Self::OneHour => 60 * 60_000,
            Self::FourHours => 4 * 60 * 60_000,
            Self::OneDay => 24 * 60 * 60_000,
        }
    }

    /// Duration of one candle at this interval, in seconds.
    #[must_use]
    pub const fn duration_seconds(self) -> i64 {
        self.duration_millis() / 1000
    }

    /// Parse a wire-format interval tag (`"1m"`, `"5m"`, ...).
    ///
    /// # Errors
    ///
    /// Returns an error if `tag` is not one of the recognized intervals.
    pub fn parse(tag: &str) -> Result<Self, DomainError> {
        match tag {
            "1m" => Ok(Self::OneMinute),
            "5m" => Ok(Self::FiveMinutes),
            "15m" => Ok(Self::FifteenMinutes),
            "1h" => Ok(Self::OneHour),
            "4h" => Ok(Self::FourHours),
            "1d" => Ok(Self::OneDay),
            other => Err(DomainError::InvalidValue {
                field: "interval".to_string(),
                message: format!("unrecognized interval '{other}'"),
            }),
        }
    }

    /// Render as the wire-format tag.
    #[must_use]
    pub const fn as_tag(self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::OneHour => "1h",
            Self::FourHours => "4h",
            Self::OneDay => "1d",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_tag())
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::OneMinute
    }
}

/// An immutable OHLCV candle.
///
/// Complete candles satisfy `high ≥ max(open, close)`, `low ≤ min(open,
/// close)`, and `endTime − startTime + 1 = intervalDuration`. Incomplete
/// candles (only ever produced by a source when explicitly allowed) have
/// `endTime < startTime + intervalDuration − 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Inclusive start of the candle, simulation milliseconds.
    pub start_time: SimTime,
    /// Inclusive end of the candle, simulation milliseconds.
    pub end_time: SimTime,
    /// Opening price.
    pub open: f64,
    /// Highest price.
    pub high: f64,
    /// Lowest price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Traded volume.
    pub volume: f64,
    /// Whether this candle has reached its full interval duration.
    pub is_complete: bool,
}

impl Candle {
    /// Construct a new candle.
    #[must_use]
    pub fn new(
        start_time: SimTime,
        end_time: SimTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        is_complete: bool,
    ) -> Self {
        Self {
            start_time,
            end_time,
            open,
            high,
            low,
            close,
            volume,
            is_complete,
        }
    }

    /// Validate invariants for a candle claimed to be complete at `interval`.
    ///
    /// # Errors
    ///
    /// Returns an error if the OHLC bounds or the start/end duration don't
    /// hold for a complete candle.
    pub fn validate_complete(&self, interval: Interval) -> Result<(), DomainError> {
        if !self.is_complete {
            return Ok(());
        }
        let hi_bound = self.open.max(self.close);
        let lo_bound = self.open.min(self.close);
        if self.high < hi_bound {
            return Err(DomainError::InvariantViolation {
                aggregate: "Candle".to_string(),
                invariant: "high >= max(open, close)".to_string(),
                state: format!("high={}, open={}, close={}", self.high, self.open, self.close),
            });
        }
        if self.low > lo_bound {
            return Err(DomainError::InvariantViolation {
                aggregate: "Candle".to_string(),
                invariant: "low <= min(open, close)".to_string(),
                state: format!("low={}, open={}, close={}", self.low, self.open, self.close),
            });
        }
        let duration = self.end_time - self.start_time + 1;
        if duration != interval.duration_millis() {
            return Err(DomainError::InvariantViolation {
                aggregate: "Candle".to_string(),
                invariant: "endTime - startTime + 1 == intervalDuration".to_string(),
                state: format!("duration={duration}, expected={}", interval.duration_millis()),
            });
        }
        Ok(())
    }
}
