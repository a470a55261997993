//! Core telemetry types for power-quality monitoring
//!
//! This module defines the data structures shared by the batch windowing pipeline
//! and the streaming monitor: raw samples, detector label rows and the
//! deduplicated anomaly events derived from them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// Wall-clock length of `samples` nominal sample periods
///
/// Saturates at [`Duration::MAX`] instead of wrapping for counts beyond `i32`.
pub fn samples_span(period: Duration, samples: usize) -> Duration {
    i32::try_from(samples)
        .ok()
        .and_then(|n| period.checked_mul(n))
        .unwrap_or(Duration::MAX)
}

/// One telemetry sample: a timestamp plus named channel readings
///
/// Channels are things like active power per phase (`PowA_L1_Ins`), total power
/// factor (`PowF_T_Ins`) or current harmonic distortion (`THDI_L1_Ins`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    /// When the sample was taken
    pub timestamp: Timestamp,
    /// Channel name to reading
    pub values: BTreeMap<String, f64>,
}

impl Sample {
    /// Create a sample from `(channel, value)` pairs
    pub fn new<I, S>(timestamp: Timestamp, values: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            timestamp,
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Reading for a channel, if present
    pub fn value(&self, channel: &str) -> Option<f64> {
        self.values.get(channel).copied()
    }

    /// Copy of this sample keeping only the given channels
    ///
    /// Channels absent from the sample are simply not carried over.
    pub fn project(&self, channels: &[String]) -> Sample {
        let values = channels
            .iter()
            .filter_map(|c| self.values.get(c).map(|v| (c.clone(), *v)))
            .collect();
        Sample {
            timestamp: self.timestamp,
            values,
        }
    }

    /// True when every reading is a finite number
    pub fn is_finite(&self) -> bool {
        self.values.values().all(|v| v.is_finite())
    }
}

/// Detector output for one timestamp: one anomaly flag per monitored channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelRow {
    pub timestamp: Timestamp,
    pub flags: BTreeMap<String, bool>,
}

impl LabelRow {
    pub fn new<I, S>(timestamp: Timestamp, flags: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        Self {
            timestamp,
            flags: flags.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// True when at least one channel is flagged
    pub fn any_flagged(&self) -> bool {
        self.flags.values().any(|&f| f)
    }
}

/// A single representative timestamp for one distinct anomaly occurrence
///
/// Produced by the event filter and immutable afterwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnomalyEvent {
    timestamp: Timestamp,
}

impl AnomalyEvent {
    pub(crate) fn at(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl From<Timestamp> for AnomalyEvent {
    fn from(timestamp: Timestamp) -> Self {
        Self::at(timestamp)
    }
}

/// Class label carried by an extracted context window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum WindowClass {
    /// Window ending at a detected anomaly
    Anomalous,
    /// Window ending far from any anomaly
    Normal,
}

impl WindowClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowClass::Anomalous => "anomalous",
            WindowClass::Normal => "normal",
        }
    }
}
