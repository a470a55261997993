//! Batch mode: labels in, windows and summary out
//!
//! Reads a samples file and the detector's label file, reduces the labels to
//! one event per burst, extracts size-matched anomalous and normal windows and
//! writes them next to the class summary.
//!
//! The study variant repeats the same pipeline for every calendar month in the
//! input and collects one summary row per month.

use crate::config::WindowsConfig;
use crate::dataset;
use crate::error::DatasetError;
use crate::filter::EventFilter;
use crate::preprocess::{normalize_min_max, preprocess};
use crate::telemetry::{AnomalyEvent, LabelRow, Sample, Timestamp};
use crate::windows::{ClassSummary, Extraction, WindowExtractor};
use chrono::Datelike;
use log::{info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const ANOMALOUS_WINDOWS_FILE: &str = "anomalous_windows.csv";
pub const NORMAL_WINDOWS_FILE: &str = "normal_windows.csv";
pub const SUMMARY_FILE: &str = "anomaly_summary.csv";
pub const SUMMARY_JSON_FILE: &str = "anomaly_summary.json";
pub const STUDY_FILE: &str = "anomaly_study.csv";

/// Everything one batch run produced
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub events: Vec<AnomalyEvent>,
    pub extraction: Extraction,
    pub written: Vec<PathBuf>,
}

/// Filter events and extract windows from in-memory data
pub fn extract(config: &WindowsConfig, samples: &[Sample], labels: &[LabelRow]) -> (Vec<AnomalyEvent>, Extraction) {
    let events = EventFilter::new(config.min_separation_samples, config.sample_period()).filter(labels);
    info!(
        "{} unique anomaly events from {} label rows",
        events.len(),
        labels.len()
    );

    let extraction = WindowExtractor::new(
        config.window_size,
        config.sample_period(),
        config.channels.clone(),
    )
    .with_trigger_channel(config.trigger_channel.clone())
    .extract(&events, samples);

    (events, extraction)
}

/// Run the whole batch pipeline over files and write the results to `out_dir`
pub fn run(
    config: &WindowsConfig,
    samples_path: &Path,
    labels_path: &Path,
    out_dir: &Path,
    normalize: bool,
) -> Result<BatchReport, DatasetError> {
    let raw = dataset::read_samples(samples_path)?;
    let (mut samples, _) = preprocess(&raw, false);
    if normalize {
        samples = normalize_min_max(&samples);
    }
    let labels = dataset::read_labels(labels_path)?;

    let (events, extraction) = extract(config, &samples, &labels);
    if !extraction.has_incidents() {
        info!("No incident in this batch");
    }

    fs::create_dir_all(out_dir)?;
    let anomalous_path = out_dir.join(ANOMALOUS_WINDOWS_FILE);
    let normal_path = out_dir.join(NORMAL_WINDOWS_FILE);
    let summary_path = out_dir.join(SUMMARY_FILE);
    let summary_json_path = out_dir.join(SUMMARY_JSON_FILE);

    dataset::write_windows(&anomalous_path, &extraction.anomalous, &config.channels)?;
    dataset::write_windows(&normal_path, &extraction.normal, &config.channels)?;
    dataset::write_summary(&summary_path, &extraction.summary)?;
    dataset::write_summary_json(&summary_json_path, &extraction.summary)?;
    info!("Wrote batch results to {}", out_dir.display());

    Ok(BatchReport {
        events,
        extraction,
        written: vec![anomalous_path, normal_path, summary_path, summary_json_path],
    })
}

/// Outcome of the extraction over one calendar month (UTC)
#[derive(Debug, Clone, PartialEq)]
pub struct MonthResult {
    pub year: i32,
    pub month: u32,
    pub anomalous_count: usize,
    pub summary: ClassSummary,
}

impl MonthResult {
    /// `YYYY-MM`
    pub fn label(&self) -> String {
        month_label(self.year, self.month)
    }
}

fn month_label(year: i32, month: u32) -> String {
    format!("{:04}-{:02}", year, month)
}

fn month_of(timestamp: Timestamp) -> (i32, u32) {
    (timestamp.year(), timestamp.month())
}

/// Channels reported in study rows: the configured ones minus the trigger
pub fn study_channels(config: &WindowsConfig) -> Vec<String> {
    config
        .channels
        .iter()
        .filter(|c| **c != config.trigger_channel)
        .cloned()
        .collect()
}

/// Run the extraction month by month
///
/// Events are separated by `study_min_separation_samples`. With `normalize`
/// each month is scaled over its own range. A month that cannot be processed
/// is logged and skipped; months without anomalies still produce a row.
pub fn study(
    config: &WindowsConfig,
    samples: &[Sample],
    labels: &[LabelRow],
    normalize: bool,
) -> Vec<MonthResult> {
    let mut months: BTreeMap<(i32, u32), (Vec<Sample>, Vec<LabelRow>)> = BTreeMap::new();
    for sample in samples {
        months.entry(month_of(sample.timestamp)).or_default().0.push(sample.clone());
    }
    for label in labels {
        months.entry(month_of(label.timestamp)).or_default().1.push(label.clone());
    }

    let month_config = WindowsConfig {
        min_separation_samples: config.study_min_separation_samples,
        ..config.clone()
    };

    let mut results = Vec::with_capacity(months.len());
    for ((year, month), (samples, labels)) in months {
        match study_month(&month_config, &samples, &labels, normalize, year, month) {
            Ok(result) => {
                if result.anomalous_count == 0 {
                    info!("Month {}: no anomalies detected", result.label());
                }
                results.push(result);
            }
            Err(e) => {
                warn!("Error processing {}: {}", month_label(year, month), e);
            }
        }
    }
    results
}

fn study_month(
    config: &WindowsConfig,
    samples: &[Sample],
    labels: &[LabelRow],
    normalize: bool,
    year: i32,
    month: u32,
) -> Result<MonthResult, DatasetError> {
    if samples.is_empty() {
        return Err(DatasetError::EmptyPeriod(month_label(year, month)));
    }
    let normalized;
    let samples = if normalize {
        normalized = normalize_min_max(samples);
        normalized.as_slice()
    } else {
        samples
    };

    let (_, extraction) = extract(config, samples, labels);
    Ok(MonthResult {
        year,
        month,
        anomalous_count: extraction.anomalous_count,
        summary: extraction.summary,
    })
}

/// Everything one study run produced
#[derive(Debug, Clone)]
pub struct StudyReport {
    pub months: Vec<MonthResult>,
    pub written: PathBuf,
}

/// Run the per-month study over files and write the study table to `out_dir`
pub fn run_study(
    config: &WindowsConfig,
    samples_path: &Path,
    labels_path: &Path,
    out_dir: &Path,
    normalize: bool,
) -> Result<StudyReport, DatasetError> {
    let raw = dataset::read_samples(samples_path)?;
    let (samples, _) = preprocess(&raw, false);
    let labels = dataset::read_labels(labels_path)?;

    info!("=== Anomaly study start ===");
    let months = study(config, &samples, &labels, normalize);

    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(STUDY_FILE);
    dataset::write_study(&path, &months, &study_channels(config))?;
    info!(
        "=== Anomaly study end: {} months written to {} ===",
        months.len(),
        path.display()
    );

    Ok(StudyReport {
        months,
        written: path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_extract_with_small_windows() {
        let config = WindowsConfig {
            window_size: 3,
            min_separation_samples: 3,
            ..WindowsConfig::default()
        };
        let t0 = Utc.timestamp_opt(0, 0).unwrap();
        let samples: Vec<Sample> = (0..20)
            .map(|i| {
                Sample::new(
                    t0 + Duration::seconds(i * 10),
                    [
                        ("PowA_L1_Ins", i as f64),
                        ("PowF_T_Ins", 0.9),
                        ("THDI_L1_Ins", 4.0),
                    ],
                )
            })
            .collect();
        // Burst at samples 5..=6, flagged on the trigger channel
        let labels: Vec<LabelRow> = (0..20)
            .map(|i| {
                LabelRow::new(
                    t0 + Duration::seconds(i * 10),
                    [("PowA_L1_Ins", i == 5 || i == 6)],
                )
            })
            .collect();

        let (events, extraction) = extract(&config, &samples, &labels);
        assert_eq!(events.len(), 1);
        assert_eq!(extraction.anomalous_count, 1);
        assert_eq!(extraction.anomalous[0].end_index, 5);
        // First candidate at least 30s away from sample 5 is sample 8
        assert_eq!(extraction.normal[0].end_index, 8);
        assert!(!extraction.summary.contains_channel("PowA_L1_Ins"));
    }

    fn sample_at(t: Timestamp, trigger: f64) -> Sample {
        Sample::new(
            t,
            [("PowA_L1_Ins", trigger), ("PowF_T_Ins", 0.9), ("THDI_L1_Ins", 4.0)],
        )
    }

    #[test]
    fn test_study_splits_by_month() {
        let config = WindowsConfig {
            window_size: 3,
            study_min_separation_samples: 3,
            ..WindowsConfig::default()
        };
        let jan = Utc.with_ymd_and_hms(2024, 1, 31, 23, 50, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let mut samples = Vec::new();
        let mut labels = Vec::new();
        // 20 January samples without flags, 20 February samples with a burst at 10
        for i in 0..20 {
            let t = jan - Duration::seconds((20 - i) * 10);
            samples.push(sample_at(t, 1.0));
            labels.push(LabelRow::new(t, [("PowA_L1_Ins", false)]));
        }
        for i in 0..20 {
            let t = feb + Duration::seconds(i * 10);
            samples.push(sample_at(t, 1.0));
            labels.push(LabelRow::new(t, [("PowA_L1_Ins", i == 10)]));
        }

        let months = study(&config, &samples, &labels, false);
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].label(), "2024-01");
        assert_eq!(months[0].anomalous_count, 0);
        assert_eq!(months[1].label(), "2024-02");
        assert_eq!(months[1].anomalous_count, 1);
        assert!(months[1].summary.contains_channel("THDI_L1_Ins"));
    }

    #[test]
    fn test_study_skips_month_without_samples() {
        let config = WindowsConfig::default();
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let labels = vec![LabelRow::new(t, [("PowA_L1_Ins", true)])];

        assert!(study(&config, &[], &labels, false).is_empty());
    }

    #[test]
    fn test_study_channels_drop_trigger() {
        assert_eq!(
            study_channels(&WindowsConfig::default()),
            vec!["PowF_T_Ins".to_string(), "THDI_L1_Ins".to_string()]
        );
    }
}
