//! CSV datasets consumed and produced by batch mode
//!
//! Samples and label files share one layout: a `time` column followed by one
//! column per channel. Times are RFC 3339 or `YYYY-MM-DD HH:MM:SS` (taken as UTC).

use crate::batch::MonthResult;
use crate::error::DatasetError;
use crate::telemetry::{LabelRow, Sample, Timestamp};
use crate::windows::{ClassSummary, Window};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs::File;
use std::path::Path;

const TIME_COLUMN: &str = "time";
const NAIVE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a timestamp cell
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Open a CSV reader and locate the `time` column
fn open(path: &Path) -> Result<(csv::Reader<File>, usize, Vec<String>), DatasetError> {
    if !path.exists() {
        return Err(DatasetError::NotFound(path.display().to_string()));
    }
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let time_idx = headers
        .iter()
        .position(|h| h == TIME_COLUMN)
        .ok_or_else(|| DatasetError::MissingColumn(TIME_COLUMN.to_string()))?;
    Ok((reader, time_idx, headers))
}

fn row_timestamp(
    record: &csv::StringRecord,
    time_idx: usize,
    row: usize,
) -> Result<Timestamp, DatasetError> {
    let raw = record.get(time_idx).unwrap_or_default();
    parse_timestamp(raw).ok_or_else(|| DatasetError::InvalidValue {
        row,
        column: TIME_COLUMN.to_string(),
        value: raw.to_string(),
    })
}

/// Read a samples file; empty cells become NaN so cleaning can drop them
pub fn read_samples(path: &Path) -> Result<Vec<Sample>, DatasetError> {
    let (mut reader, time_idx, headers) = open(path)?;
    let mut samples = Vec::new();

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let timestamp = row_timestamp(&record, time_idx, row)?;
        let mut values = Vec::with_capacity(headers.len().saturating_sub(1));
        for (idx, header) in headers.iter().enumerate() {
            if idx == time_idx {
                continue;
            }
            let cell = record.get(idx).unwrap_or_default().trim();
            let value = if cell.is_empty() {
                f64::NAN
            } else {
                cell.parse::<f64>().map_err(|_| DatasetError::InvalidValue {
                    row,
                    column: header.clone(),
                    value: cell.to_string(),
                })?
            };
            values.push((header.clone(), value));
        }
        samples.push(Sample::new(timestamp, values));
    }

    Ok(samples)
}

fn parse_flag(cell: &str) -> Option<bool> {
    match cell.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "1.0" => Some(true),
        "false" | "0" | "0.0" | "" => Some(false),
        _ => None,
    }
}

/// Read a detector label file
pub fn read_labels(path: &Path) -> Result<Vec<LabelRow>, DatasetError> {
    let (mut reader, time_idx, headers) = open(path)?;
    let mut labels = Vec::new();

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let timestamp = row_timestamp(&record, time_idx, row)?;
        let mut flags = Vec::with_capacity(headers.len().saturating_sub(1));
        for (idx, header) in headers.iter().enumerate() {
            if idx == time_idx {
                continue;
            }
            let cell = record.get(idx).unwrap_or_default();
            let flag = parse_flag(cell).ok_or_else(|| DatasetError::InvalidValue {
                row,
                column: header.clone(),
                value: cell.to_string(),
            })?;
            flags.push((header.clone(), flag));
        }
        labels.push(LabelRow::new(timestamp, flags));
    }

    Ok(labels)
}

/// Read one numeric column of a forecast file
pub fn read_forecast(path: &Path, column: &str) -> Result<Vec<f64>, DatasetError> {
    if !path.exists() {
        return Err(DatasetError::NotFound(path.display().to_string()));
    }
    let mut reader = csv::Reader::from_path(path)?;
    let idx = reader
        .headers()?
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| DatasetError::MissingColumn(column.to_string()))?;

    let mut values = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let cell = record.get(idx).unwrap_or_default().trim();
        let value = cell.parse::<f64>().map_err(|_| DatasetError::InvalidValue {
            row,
            column: column.to_string(),
            value: cell.to_string(),
        })?;
        values.push(value);
    }
    Ok(values)
}

/// Write windows as long-format rows: one row per sample per window
pub fn write_windows(path: &Path, windows: &[Window], channels: &[String]) -> Result<(), DatasetError> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec![
        "window".to_string(),
        "class".to_string(),
        "index".to_string(),
        TIME_COLUMN.to_string(),
    ];
    header.extend(channels.iter().cloned());
    writer.write_record(&header)?;

    for (n, window) in windows.iter().enumerate() {
        for (offset, sample) in window.samples.iter().enumerate() {
            let mut record = vec![
                n.to_string(),
                window.class.as_str().to_string(),
                (window.start_index() + offset).to_string(),
                sample.timestamp.format(NAIVE_FORMAT).to_string(),
            ];
            record.extend(
                channels
                    .iter()
                    .map(|c| sample.value(c).map(|v| v.to_string()).unwrap_or_default()),
            );
            writer.write_record(&record)?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Write the flat summary record as a one-row CSV
pub fn write_summary(path: &Path, summary: &ClassSummary) -> Result<(), DatasetError> {
    let record = summary.to_record();
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(record.iter().map(|(name, _)| name.as_str()))?;
    writer.write_record(record.iter().map(|(_, value)| value.to_string()))?;
    writer.flush()?;
    Ok(())
}

/// Write the summary with per-class structure preserved
pub fn write_summary_json(path: &Path, summary: &ClassSummary) -> Result<(), DatasetError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, summary)?;
    Ok(())
}

/// Write the study table: one row per month with its flattened summary
pub fn write_study(path: &Path, months: &[MonthResult], channels: &[String]) -> Result<(), DatasetError> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["month".to_string(), "anomalous_count".to_string()];
    header.extend(
        ClassSummary::default()
            .to_record_for(channels)
            .into_iter()
            .map(|(name, _)| name),
    );
    writer.write_record(&header)?;

    for month in months {
        let mut record = vec![month.label(), month.anomalous_count.to_string()];
        record.extend(
            month
                .summary
                .to_record_for(channels)
                .into_iter()
                .map(|(_, value)| value.to_string()),
        );
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
