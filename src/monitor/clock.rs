use crate::telemetry::Timestamp;
use chrono::{Duration, SubsecRound, Utc};
use std::sync::{Arc, Mutex};

/// Source of "now" for the polling loop
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock, truncated to whole seconds
///
/// Two polls inside the same second therefore see the same `now`, which the
/// monitor treats as an empty time range.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now().trunc_subsecs(0)
    }
}

/// Hand-driven clock for tests and simulations
///
/// Clones share the same time. With a non-zero tick the clock advances by
/// that amount after every read.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
    tick: Duration,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self::ticking(start, Duration::zero())
    }

    pub fn ticking(start: Timestamp, tick: Duration) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
            tick,
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        let current = *now;
        *now += self.tick;
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_system_clock_has_no_subseconds() {
        assert_eq!(SystemClock.now().nanosecond(), 0);
    }

    #[test]
    fn test_manual_clock() {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let clock = ManualClock::new(start);
        let shared = clock.clone();

        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start);
        shared.advance(Duration::seconds(10));
        assert_eq!(clock.now(), start + Duration::seconds(10));
    }

    #[test]
    fn test_ticking_clock() {
        let start = Utc.timestamp_opt(0, 0).unwrap();
        let clock = ManualClock::ticking(start, Duration::seconds(10));
        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start + Duration::seconds(10));
    }
}
