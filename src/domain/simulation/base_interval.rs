//! The Base-Interval Selector: a pure policy mapping replay speed to the
//! base candle interval actually fetched from the Candle Source, and to the
//! real-time period between successive emissions.

use std::time::Duration;

use crate::domain::candle::Interval;
use crate::domain::shared::DomainError;

/// Replay speed: simulated seconds advanced per one real second.
///
/// Must be strictly positive; `Start`/`SetSpeed` reject zero or negative
/// values before a `Speed` is ever constructed.
pub type Speed = i64;

/// Choose the largest base interval whose duration in seconds is at most
/// `speed`, defaulting to `1m` when even the smallest interval exceeds it.
///
/// # Errors
///
/// Returns an error if `speed` is not strictly positive.
pub fn select_base_interval(speed: Speed) -> Result<Interval, DomainError> {
    if speed <= 0 {
        return Err(DomainError::InvalidValue {
            field: "speed".to_string(),
            message: "speed must be strictly positive".to_string(),
        });
    }
    let chosen = Interval::ALL
        .into_iter()
        .filter(|interval| interval.duration_seconds() <= speed)
        .next_back()
        .unwrap_or(Interval::OneMinute);
    Ok(chosen)
}

/// The minimum display timeframe allowed at `speed`: identical to the base
/// interval, since the display timeframe can never be finer than what's
/// actually fetched.
///
/// # Errors
///
/// Returns an error if `speed` is not strictly positive.
pub fn min_allowed_display(speed: Speed) -> Result<Interval, DomainError> {
    select_base_interval(speed)
}

/// Validate that `display` is compatible with `speed`: `display` must be at
/// an interval duration greater than or equal to `minAllowedDisplay(speed)`.
///
/// # Errors
///
/// Returns `DomainError::InvalidValue` if `display` is narrower than the
/// minimum allowed display timeframe at this speed.
pub fn validate_timeframe(speed: Speed, display: Interval) -> Result<(), DomainError> {
    let minimum = min_allowed_display(speed)?;
    if display.duration_seconds() < minimum.duration_seconds() {
        return Err(DomainError::InvalidValue {
            field: "displayInterval".to_string(),
            message: format!(
                "display interval {display} is narrower than the minimum allowed {minimum} at speed {speed}"
            ),
        });
    }
    Ok(())
}

/// Real time between two successive base-candle emissions, given `speed`
/// and the chosen `base_interval`.
///
/// This is `1s × (baseInterval_seconds / speed)`: it guarantees exactly one
/// emission per base candle of simulated time, so a display candle built
/// from N base candles is observed progressively across N emissions.
#[must_use]
pub fn ticker_interval(speed: Speed, base_interval: Interval) -> Duration {
    let seconds = base_interval.duration_seconds() as f64 / speed as f64;
    Duration::from_secs_f64(seconds.max(0.0))
}
