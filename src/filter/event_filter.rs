//! Collapses per-timestamp detector flags into distinct anomaly events
//!
//! Detectors tend to flag a whole burst of consecutive samples around one
//! disturbance. The filter keeps the first flagged sample of each burst and
//! suppresses everything within the separation horizon after it.

use crate::telemetry::{samples_span, AnomalyEvent, LabelRow, Timestamp};
use chrono::Duration;
use log::debug;

/// Greedy forward-sweep filter with a minimum separation between events
#[derive(Debug, Clone)]
pub struct EventFilter {
    /// Minimum separation between two events, in samples
    pub min_separation_samples: u32,
    /// Nominal spacing between consecutive samples
    pub sample_period: Duration,
}

impl EventFilter {
    /// Create a new event filter
    ///
    /// # Arguments
    ///
    /// * `min_separation_samples` - Events closer than this many samples collapse into one
    /// * `sample_period` - Nominal sample period used to turn samples into wall-clock time
    pub fn new(min_separation_samples: u32, sample_period: Duration) -> Self {
        Self {
            min_separation_samples,
            sample_period,
        }
    }

    /// 300 samples at a 10 second period
    pub fn with_defaults() -> Self {
        Self::new(300, Duration::seconds(10))
    }

    /// Wall-clock horizon an event suppresses after itself
    pub fn horizon(&self) -> Duration {
        samples_span(self.sample_period, self.min_separation_samples as usize)
    }

    /// Reduce label rows to one event per burst
    ///
    /// Rows with no flagged channel are dropped first. The remaining rows are
    /// scanned in order; a row becomes a new event when it is the first one or
    /// when it lies strictly more than [`horizon`](Self::horizon) after the
    /// previously kept event. Output timestamps are strictly increasing.
    pub fn filter(&self, labels: &[LabelRow]) -> Vec<AnomalyEvent> {
        let horizon = self.horizon();
        let mut events = Vec::new();
        let mut last: Option<Timestamp> = None;

        for row in labels.iter().filter(|row| row.any_flagged()) {
            let keep = match last {
                None => true,
                Some(prev) => row.timestamp - prev > horizon,
            };
            if keep {
                events.push(AnomalyEvent::at(row.timestamp));
                last = Some(row.timestamp);
            }
        }

        debug!(
            "Event filter kept {} of {} label rows (horizon {}s)",
            events.len(),
            labels.len(),
            horizon.num_seconds()
        );
        events
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Convenience wrapper around [`EventFilter::filter`]
pub fn filter_unique_events(
    labels: &[LabelRow],
    min_separation_samples: u32,
    sample_period_seconds: i64,
) -> Vec<AnomalyEvent> {
    EventFilter::new(
        min_separation_samples,
        Duration::seconds(sample_period_seconds),
    )
    .filter(labels)
}
