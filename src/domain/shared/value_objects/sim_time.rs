//! Simulation time value object: the virtual clock advanced by the replay engine.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Milliseconds since the epoch, as measured on the simulation's virtual clock.
///
/// All wire timestamps (`startTime`, `endTime`, `currentPriceTime`, ...) are
/// integer milliseconds; this type keeps arithmetic on them exact and avoids
/// mixing simulation time with wall-clock time by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimTime(i64);

impl SimTime {
    /// Create a SimTime from a raw millisecond value.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Get the raw millisecond value.
    #[must_use]
    pub const fn millis(&self) -> i64 {
        self.0
    }

    /// Round down to the nearest multiple of `interval_millis`.
    #[must_use]
    pub fn floor_to(&self, interval_millis: i64) -> Self {
        Self(self.0.div_euclid(interval_millis) * interval_millis)
    }

    /// Render as a UTC `DateTime` (useful for logging and error messages).
    #[must_use]
    pub fn as_datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.0).single().unwrap_or(Utc::now())
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add<i64> for SimTime {
    type Output = Self;

    fn add(self, rhs: i64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl Sub<i64> for SimTime {
    type Output = Self;

    fn sub(self, rhs: i64) -> Self::Output {
        Self(self.0 - rhs)
    }
}

impl Sub for SimTime {
    type Output = i64;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0 - rhs.0
    }
}

impl From<i64> for SimTime {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<SimTime> for i64 {
    fn from(value: SimTime) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_time_from_millis_and_display() {
        let t = SimTime::from_millis(60_000);
        assert_eq!(format!("{t}"), "60000");
    }

    #[test]
    fn sim_time_ordering() {
        let a = SimTime::from_millis(1_000);
        let b = SimTime::from_millis(2_000);
        assert!(a < b);
        assert!(b > a);
    }

    #[test]
    fn sim_time_add_and_sub_millis() {
        let t = SimTime::from_millis(1_000);
        assert_eq!((t + 500).millis(), 1_500);
        assert_eq!((t - 500).millis(), 500);
    }

    #[test]
    fn sim_time_difference() {
        let a = SimTime::from_millis(5_000);
        let b = SimTime::from_millis(2_000);
        assert_eq!(a - b, 3_000);
    }

    #[test]
    fn sim_time_floor_to_interval() {
        let t = SimTime::from_millis(125_000);
        assert_eq!(t.floor_to(60_000).millis(), 120_000);
    }

    #[test]
    fn sim_time_floor_to_exact_boundary_unchanged() {
        let t = SimTime::from_millis(120_000);
        assert_eq!(t.floor_to(60_000).millis(), 120_000);
    }

    #[test]
    fn sim_time_from_conversions() {
        let t: SimTime = 60_000i64.into();
        assert_eq!(t.millis(), 60_000);
        let millis: i64 = t.into();
        assert_eq!(millis, 60_000);
    }

    #[test]
    fn sim_time_serde_roundtrip() {
        let t = SimTime::from_millis(123_456);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "123456");
        let parsed: SimTime = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, t);
    }
}
