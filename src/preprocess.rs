//! Sample cleaning and normalisation
//!
//! The same cleaning is applied to the reference dataset in batch mode and to
//! the live buffer before scoring; the monitor uses the quiet variant so that
//! every iteration does not repeat the cleaning report.

use crate::error::ScoringError;
use crate::telemetry::Sample;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Readings further than this many standard deviations from the mean are reported
const ZSCORE_THRESHOLD: f64 = 3.0;

/// Report of what cleaning removed or noticed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningReport {
    pub duplicate_timestamps: usize,
    pub non_finite_rows: usize,
    /// Channel name to number of readings beyond the z-score threshold
    pub outliers: BTreeMap<String, usize>,
}

/// Clean a sample sequence
///
/// Drops samples whose timestamp was already seen (the first one is kept),
/// then drops samples carrying any non-finite reading. Outliers are counted
/// per channel but kept. With `quiet` set nothing is logged.
pub fn preprocess(samples: &[Sample], quiet: bool) -> (Vec<Sample>, CleaningReport) {
    let mut report = CleaningReport::default();
    let mut seen = HashSet::with_capacity(samples.len());

    let deduped: Vec<&Sample> = samples
        .iter()
        .filter(|s| seen.insert(s.timestamp))
        .collect();
    report.duplicate_timestamps = samples.len() - deduped.len();

    let cleaned: Vec<Sample> = deduped
        .into_iter()
        .filter(|s| s.is_finite())
        .cloned()
        .collect();
    report.non_finite_rows = samples.len() - report.duplicate_timestamps - cleaned.len();

    for channel in channel_names(&cleaned) {
        let values: Vec<f64> = cleaned.iter().filter_map(|s| s.value(&channel)).collect();
        let count = count_outliers(&values);
        if count > 0 {
            report.outliers.insert(channel, count);
        }
    }

    if !quiet {
        info!(
            "Preprocessing: {} rows in, {} duplicate timestamps, {} rows with missing values, {} rows out",
            samples.len(),
            report.duplicate_timestamps,
            report.non_finite_rows,
            cleaned.len()
        );
        for (channel, count) in &report.outliers {
            warn!(
                "Outliers in '{}': {} values (z-score > {})",
                channel, count, ZSCORE_THRESHOLD
            );
        }
    }

    (cleaned, report)
}

fn channel_names(samples: &[Sample]) -> Vec<String> {
    let mut names: Vec<String> = samples
        .iter()
        .flat_map(|s| s.values.keys().cloned())
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Count readings with |z| above the threshold, using the population std
fn count_outliers(values: &[f64]) -> usize {
    if values.len() < 2 {
        return 0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    if std == 0.0 {
        return 0;
    }
    values
        .iter()
        .filter(|v| ((*v - mean) / std).abs() > ZSCORE_THRESHOLD)
        .count()
}

/// Observed min and max of one channel in a clean, unnormalised dataset
///
/// Used to bring normalised forecasts back into physical units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ReferenceRange {
    pub min: f64,
    pub max: f64,
}

impl ReferenceRange {
    pub fn new(min: f64, max: f64) -> Result<Self, ScoringError> {
        if !(min.is_finite() && max.is_finite()) || min > max {
            return Err(ScoringError::InvalidReference { min, max });
        }
        Ok(Self { min, max })
    }

    /// Range of `channel` over the samples, `None` if no sample carries it
    pub fn from_samples(samples: &[Sample], channel: &str) -> Option<Self> {
        samples
            .iter()
            .filter_map(|s| s.value(channel))
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some(Self { min: v, max: v }),
                Some(r) => Some(Self {
                    min: r.min.min(v),
                    max: r.max.max(v),
                }),
            })
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Map a value from [0, 1] back into this range
    pub fn denormalize(&self, normalized: f64) -> f64 {
        normalized * self.span() + self.min
    }

    /// Map a value from this range onto [0, 1]; constant ranges map to 0
    pub fn normalize(&self, value: f64) -> f64 {
        if self.span() == 0.0 {
            0.0
        } else {
            (value - self.min) / self.span()
        }
    }
}

/// Min/max normalise every channel onto [0, 1]
pub fn normalize_min_max(samples: &[Sample]) -> Vec<Sample> {
    let ranges: BTreeMap<String, ReferenceRange> = channel_names(samples)
        .into_iter()
        .filter_map(|c| ReferenceRange::from_samples(samples, &c).map(|r| (c, r)))
        .collect();

    samples
        .iter()
        .map(|s| Sample {
            timestamp: s.timestamp,
            values: s
                .values
                .iter()
                .map(|(c, v)| {
                    let normalized = ranges.get(c).map_or(*v, |r| r.normalize(*v));
                    (c.clone(), normalized)
                })
                .collect(),
        })
        .collect()
}
