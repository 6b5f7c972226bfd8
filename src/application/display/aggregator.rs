//! Display Aggregator (§4.5, client-side counterpart): progressively folds
//! emitted base candles into incomplete display-timeframe candles.
//!
//! Kept and tested in-crate per `SPEC_FULL.md`'s module map even though
//! §1 places the viewer itself out of scope: §8's testable properties
//! (idempotent aggregation, no parallel candle for one `displayStart`)
//! apply to this folding logic directly.

use crate::domain::candle::{Candle, Interval};
use crate::domain::shared::SimTime;

/// Folds a stream of complete base candles into incomplete/complete
/// display-timeframe candles, one per `displayStart` bucket.
#[derive(Debug, Clone, Default)]
pub struct DisplayAggregator {
    display_interval_millis: i64,
    current: Option<Candle>,
}

impl DisplayAggregator {
    /// Create an aggregator folding into `display_interval`.
    #[must_use]
    pub fn new(display_interval: Interval) -> Self {
        Self {
            display_interval_millis: display_interval.duration_millis(),
            current: None,
        }
    }

    /// Seed the aggregator with a display candle already built by the
    /// initial history load (§4.5 boundary invariant): the next base
    /// candle with a matching `displayStart` folds into it rather than
    /// starting a second, parallel candle.
    pub fn seed(&mut self, candle: Candle) {
        self.current = Some(candle);
    }

    /// The in-progress display candle, if any base candle has been folded
    /// in yet.
    #[must_use]
    pub fn current(&self) -> Option<&Candle> {
        self.current.as_ref()
    }

    /// Fold one emitted base candle `b` into the display timeframe,
    /// returning the resulting display candle (which may now be complete).
    ///
    /// If `b`'s `displayStart` matches the in-progress candle's, it folds
    /// in place (§4.5 step 2); otherwise a new display candle starts,
    /// seeded from `b` (§4.5 step 3) — this only happens once per
    /// `displayStart` in correct usage, since base candles arrive in
    /// strictly increasing `startTime` order.
    pub fn fold(&mut self, b: Candle) -> Candle {
        let display_start = display_start_for(b.start_time, self.display_interval_millis);

        let folded = match self.current.take() {
            Some(mut existing) if display_start_for(existing.start_time, self.display_interval_millis) == display_start => {
                existing.high = existing.high.max(b.high);
                existing.low = existing.low.min(b.low);
                existing.close = b.close;
                existing.volume += b.volume;
                if b.end_time > existing.end_time {
                    existing.end_time = b.end_time;
                }
                existing
            }
            _ => Candle::new(
                display_start,
                b.end_time,
                b.open,
                b.high,
                b.low,
                b.close,
                b.volume,
                false,
            ),
        };

        let is_complete = folded.end_time.millis() >= display_start.millis() + self.display_interval_millis - 1;
        let folded = Candle {
            is_complete,
            ..folded
        };
        self.current = Some(folded);
        folded
    }
}

fn display_start_for(start_time: SimTime, display_interval_millis: i64) -> SimTime {
    start_time.floor_to(display_interval_millis)
}
