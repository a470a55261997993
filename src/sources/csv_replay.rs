//! Replays a recorded samples file through the polling interface
//!
//! The recording is re-anchored on the first poll so its first sample lands
//! just after the poll's start time; from then on each poll returns the
//! recorded samples whose shifted timestamps fall inside the requested range.

use crate::dataset;
use crate::error::{DatasetError, SourceError};
use crate::sources::{DataSource, PollFuture};
use crate::telemetry::{Sample, Timestamp};
use chrono::Duration;
use log::{debug, info};
use std::path::Path;
use std::sync::Mutex;

pub struct CsvReplaySource {
    samples: Vec<Sample>,
    /// Shift applied to recorded timestamps, fixed on the first poll
    offset: Mutex<Option<Duration>>,
}

impl CsvReplaySource {
    /// Load a recording from disk
    pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
        let samples = dataset::read_samples(path)?;
        info!(
            "Loaded {} samples for replay from {}",
            samples.len(),
            path.display()
        );
        Ok(Self::from_samples(samples))
    }

    pub fn from_samples(mut samples: Vec<Sample>) -> Self {
        samples.sort_by_key(|s| s.timestamp);
        Self {
            samples,
            offset: Mutex::new(None),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn offset_for(&self, start: Timestamp) -> Result<Option<Duration>, SourceError> {
        let mut offset = self
            .offset
            .lock()
            .map_err(|_| SourceError::Unavailable("replay state poisoned".to_string()))?;
        if offset.is_none() {
            if let Some(first) = self.samples.first() {
                let shift = start - first.timestamp + Duration::seconds(1);
                debug!("Anchoring replay with offset {}s", shift.num_seconds());
                *offset = Some(shift);
            }
        }
        Ok(*offset)
    }

    fn rows_between(&self, start: Timestamp, end: Timestamp) -> Result<Vec<Sample>, SourceError> {
        if end < start {
            return Err(SourceError::InvalidRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        let Some(offset) = self.offset_for(start)? else {
            return Ok(Vec::new());
        };

        Ok(self
            .samples
            .iter()
            .filter_map(|s| {
                let shifted = s.timestamp + offset;
                (shifted > start && shifted <= end).then(|| Sample {
                    timestamp: shifted,
                    values: s.values.clone(),
                })
            })
            .collect())
    }
}

impl DataSource for CsvReplaySource {
    fn poll<'a>(&'a self, start: Timestamp, end: Timestamp, location: &'a str) -> PollFuture<'a> {
        Box::pin(async move {
            debug!("Replay poll for '{}' in ({}, {}]", location, start, end);
            self.rows_between(start, end)
        })
    }

    fn name(&self) -> &str {
        "csv-replay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn recording() -> Vec<Sample> {
        (0..5)
            .map(|i| {
                Sample::new(
                    Utc.timestamp_opt(1_000 + i * 10, 0).unwrap(),
                    [("PowF_T_Ins", i as f64)],
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_replay_is_anchored_on_first_poll() {
        let source = CsvReplaySource::from_samples(recording());
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let first = source
            .poll(start, start + Duration::seconds(15), "MEDIA")
            .await
            .unwrap();
        // Samples at +1s and +11s
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].timestamp, start + Duration::seconds(1));
        assert_eq!(first[1].value("PowF_T_Ins"), Some(1.0));

        let second = source
            .poll(
                start + Duration::seconds(15),
                start + Duration::seconds(100),
                "MEDIA",
            )
            .await
            .unwrap();
        assert_eq!(second.len(), 3);

        let after = source
            .poll(
                start + Duration::seconds(100),
                start + Duration::seconds(200),
                "MEDIA",
            )
            .await
            .unwrap();
        assert!(after.is_empty());
    }

    #[tokio::test]
    async fn test_empty_recording_returns_no_rows() {
        let source = CsvReplaySource::from_samples(Vec::new());
        let start = Utc.timestamp_opt(0, 0).unwrap();
        assert!(source
            .poll(start, start + Duration::seconds(10), "MEDIA")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_reversed_range_is_rejected() {
        let source = CsvReplaySource::from_samples(recording());
        let start = Utc.timestamp_opt(100, 0).unwrap();
        assert!(source
            .poll(start, start - Duration::seconds(10), "MEDIA")
            .await
            .is_err());
    }

    #[test]
    fn test_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"time,PowF_T_Ins\n2024-01-01 00:00:10,0.9\n2024-01-01 00:00:00,0.8\n")
            .unwrap();

        let source = CsvReplaySource::from_path(file.path()).unwrap();
        assert_eq!(source.len(), 2);
        // Sorted on load
        assert_eq!(source.samples[0].value("PowF_T_Ins"), Some(0.8));
    }
}
