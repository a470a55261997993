//! Fixed-length context window extraction around anomalous and normal samples
//!
//! Each anomaly event yields one trailing window of `W + 1` consecutive samples
//! ending at the event. A size-matched set of normal windows is then drawn from
//! the stream, avoiding anything within `W` sample periods of an anomaly, so the
//! two classes can be compared without bias.

use crate::telemetry::{samples_span, AnomalyEvent, Sample, Timestamp, WindowClass};
use crate::windows::ClassSummary;
use chrono::Duration;
use log::{debug, info, warn};
use std::collections::HashMap;

/// An ordered run of `W + 1` consecutive samples ending at `end_index`
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub class: WindowClass,
    /// Index of the last sample in the source stream
    pub end_index: usize,
    /// Samples restricted to the extractor's channels
    pub samples: Vec<Sample>,
}

impl Window {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Index of the first sample in the source stream
    pub fn start_index(&self) -> usize {
        self.end_index + 1 - self.samples.len()
    }

    pub fn end_timestamp(&self) -> Option<Timestamp> {
        self.samples.last().map(|s| s.timestamp)
    }

    /// Wall-clock time between the first and last sample
    pub fn span(&self) -> Duration {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => Duration::zero(),
        }
    }
}

/// Everything produced by one extraction pass
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub anomalous: Vec<Window>,
    pub normal: Vec<Window>,
    pub summary: ClassSummary,
    /// Number of anomalous windows emitted
    pub anomalous_count: usize,
    /// Events whose timestamp does not appear in the sample stream
    pub missing_events: usize,
    /// Events too close to the start of the stream for a full window
    pub early_events: usize,
}

impl Extraction {
    /// An empty anomalous set means no incident in this batch
    pub fn has_incidents(&self) -> bool {
        !self.anomalous.is_empty()
    }
}

/// Builds anomalous and normal context windows from an ordered sample stream
#[derive(Debug, Clone)]
pub struct WindowExtractor {
    /// `W`: samples before the end sample; each window holds `W + 1`
    pub window_size: usize,
    /// Nominal spacing between consecutive samples
    pub sample_period: Duration,
    /// Channels carried into each window
    pub channels: Vec<String>,
    /// Channels left out of the summary (the one used to select events)
    pub excluded_from_summary: Vec<String>,
}

impl WindowExtractor {
    /// Create a new extractor
    ///
    /// # Arguments
    ///
    /// * `window_size` - Number of samples preceding the end sample (`W`)
    /// * `sample_period` - Nominal sample period, used for the normal-window exclusion zone
    /// * `channels` - Channels copied into every window
    pub fn new(window_size: usize, sample_period: Duration, channels: Vec<String>) -> Self {
        Self {
            window_size,
            sample_period,
            channels,
            excluded_from_summary: Vec::new(),
        }
    }

    /// Exclude the event-triggering channel from the summary
    pub fn with_trigger_channel(mut self, channel: impl Into<String>) -> Self {
        self.excluded_from_summary.push(channel.into());
        self
    }

    /// Distance from an anomaly inside which no normal window may end
    pub fn exclusion_zone(&self) -> Duration {
        samples_span(self.sample_period, self.window_size)
    }

    /// Extract windows for the given events
    ///
    /// Events not present in `samples` are skipped and counted in
    /// `missing_events`; events with fewer than `W` samples before them are
    /// counted in `early_events`. Normal windows are emitted in stream order
    /// until their count matches the anomalous count.
    pub fn extract(&self, events: &[AnomalyEvent], samples: &[Sample]) -> Extraction {
        let w = self.window_size;
        let mut extraction = Extraction::default();

        let mut index: HashMap<Timestamp, usize> = HashMap::with_capacity(samples.len());
        for (i, sample) in samples.iter().enumerate() {
            index.entry(sample.timestamp).or_insert(i);
        }

        for event in events {
            let Some(&pos) = index.get(&event.timestamp()) else {
                extraction.missing_events += 1;
                continue;
            };
            if pos < w {
                extraction.early_events += 1;
                continue;
            }
            extraction
                .anomalous
                .push(self.window(samples, pos, WindowClass::Anomalous));
        }
        extraction.anomalous_count = extraction.anomalous.len();

        if extraction.missing_events > 0 {
            debug!(
                "{} anomaly events not found in the sample stream",
                extraction.missing_events
            );
        }

        let wanted = extraction.anomalous_count;
        if wanted > 0 {
            let zone = self.exclusion_zone();
            for i in (w + 1)..samples.len() {
                if extraction.normal.len() >= wanted {
                    break;
                }
                let t = samples[i].timestamp;
                let near_anomaly = events
                    .iter()
                    .any(|e| (t - e.timestamp()).abs() < zone);
                if near_anomaly {
                    continue;
                }
                extraction
                    .normal
                    .push(self.window(samples, i, WindowClass::Normal));
            }
        }

        if extraction.normal.len() < wanted {
            warn!(
                "Only {} normal windows available for {} anomalous windows",
                extraction.normal.len(),
                wanted
            );
        }

        extraction.summary = ClassSummary::compute(
            &extraction.anomalous,
            &extraction.normal,
            &self.channels,
            &self.excluded_from_summary,
        );

        info!(
            "Extracted {} anomalous and {} normal windows of {} samples",
            extraction.anomalous.len(),
            extraction.normal.len(),
            w + 1
        );
        extraction
    }

    fn window(&self, samples: &[Sample], end: usize, class: WindowClass) -> Window {
        let window = Window {
            class,
            end_index: end,
            samples: samples[end - self.window_size..=end]
                .iter()
                .map(|s| s.project(&self.channels))
                .collect(),
        };

        // Gaps are not rejected, only reported
        if window.span() > self.exclusion_zone() {
            warn!(
                "{} window ending at index {} spans {}s, expected at most {}s",
                class.as_str(),
                end,
                window.span().num_seconds(),
                self.exclusion_zone().num_seconds()
            );
        }
        window
    }
}


// Property-based tests
#[cfg(test)]
mod property_tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    #[derive(Debug, Clone)]
    struct Scenario {
        len: usize,
        window: usize,
        event_indices: Vec<usize>,
    }

    impl Arbitrary for Scenario {
        fn arbitrary(g: &mut Gen) -> Self {
            let len = usize::arbitrary(g) % 400 + 1;
            let window = usize::arbitrary(g) % 40 + 1;
            let count = usize::arbitrary(g) % 6;
            let mut event_indices: Vec<usize> =
                (0..count).map(|_| usize::arbitrary(g) % (len + 20)).collect();
            event_indices.sort_unstable();
            event_indices.dedup();
            Scenario {
                len,
                window,
                event_indices,
            }
        }
    }

    fn run(scenario: &Scenario) -> Extraction {
        let samples: Vec<Sample> = (0..scenario.len)
            .map(|i| {
                Sample::new(
                    Utc.timestamp_opt(i as i64 * 10, 0).unwrap(),
                    [("a", i as f64), ("b", 1.0)],
                )
            })
            .collect();
        // Indices past the end become events missing from the stream
        let events: Vec<AnomalyEvent> = scenario
            .event_indices
            .iter()
            .map(|&i| AnomalyEvent::from(Utc.timestamp_opt(i as i64 * 10, 0).unwrap()))
            .collect();
        WindowExtractor::new(
            scenario.window,
            Duration::seconds(10),
            vec!["a".to_string(), "b".to_string()],
        )
        .with_trigger_channel("a")
        .extract(&events, &samples)
    }

    #[quickcheck]
    fn prop_never_more_normal_than_anomalous(scenario: Scenario) -> bool {
        let extraction = run(&scenario);
        extraction.normal.len() <= extraction.anomalous.len()
            && extraction.anomalous_count == extraction.anomalous.len()
    }

    #[quickcheck]
    fn prop_every_window_has_w_plus_one_samples(scenario: Scenario) -> bool {
        let extraction = run(&scenario);
        extraction
            .anomalous
            .iter()
            .chain(extraction.normal.iter())
            .all(|w| w.len() == scenario.window + 1)
    }

    #[quickcheck]
    fn prop_every_event_is_accounted_for(scenario: Scenario) -> bool {
        let extraction = run(&scenario);
        extraction.anomalous.len() + extraction.missing_events + extraction.early_events
            == scenario.event_indices.len()
    }

    #[quickcheck]
    fn prop_summary_never_contains_trigger_channel(scenario: Scenario) -> bool {
        !run(&scenario).summary.contains_channel("a")
    }
}
