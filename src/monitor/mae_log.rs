//! Append-only CSV log of the MAE time series
//!
//! Columns are `time_utc,time_local,MAE`. The header is written only when the
//! file is new or empty, so restarts keep appending to the same series.

use crate::error::PersistError;
use crate::telemetry::Timestamp;
use chrono::FixedOffset;
use log::debug;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

const HEADER: [&str; 3] = ["time_utc", "time_local", "MAE"];
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct MaeLog {
    path: PathBuf,
    local_offset: FixedOffset,
}

impl MaeLog {
    /// Prepare the log target, creating missing parent directories
    pub fn open(path: impl Into<PathBuf>, local_offset: FixedOffset) -> Result<Self, PersistError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        debug!("MAE log at {}", path.display());
        Ok(Self { path, local_offset })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one scored point
    pub fn append(&self, timestamp: Timestamp, mae: f64) -> Result<(), PersistError> {
        let needs_header = fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(HEADER)?;
        }
        writer.write_record([
            timestamp.format(TIME_FORMAT).to_string(),
            timestamp
                .with_timezone(&self.local_offset)
                .format(TIME_FORMAT)
                .to_string(),
            mae.to_string(),
        ])?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(-3 * 3600).unwrap()
    }

    #[test]
    fn test_header_written_once() {
        let dir = TempDir::new().unwrap();
        let log = MaeLog::open(dir.path().join("nested/raw/mae.csv"), offset()).unwrap();
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        log.append(t, 0.5).unwrap();
        log.append(t + chrono::Duration::seconds(8), 0.25).unwrap();

        let written = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(
            lines,
            vec![
                "time_utc,time_local,MAE",
                "2024-03-01 12:00:00,2024-03-01 09:00:00,0.5",
                "2024-03-01 12:00:08,2024-03-01 09:00:08,0.25",
            ]
        );
    }

    #[test]
    fn test_existing_log_is_appended_without_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mae.csv");
        fs::write(&path, "time_utc,time_local,MAE\n2024-03-01 00:00:00,2024-02-29 21:00:00,1\n")
            .unwrap();

        let log = MaeLog::open(&path, offset()).unwrap();
        log.append(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 8).unwrap(), 2.0)
            .unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written.matches("time_utc").count(), 1);
        assert_eq!(written.lines().count(), 3);
    }

    #[test]
    fn test_empty_file_gets_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mae.csv");
        fs::write(&path, "").unwrap();

        let log = MaeLog::open(&path, offset()).unwrap();
        log.append(Utc.timestamp_opt(0, 0).unwrap(), 1.0).unwrap();
        assert!(fs::read_to_string(&path).unwrap().starts_with("time_utc"));
    }
}
