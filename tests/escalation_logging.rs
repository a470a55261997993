//! Log output of the monitor's empty-poll handling
//!
//! Kept in its own test binary because it installs the global logger.

use chrono::{Duration, TimeZone, Utc};
use log::{Level, LevelFilter, Log, Metadata, Record};
use pqwatch::monitor::{IterationOutcome, ManualClock, MonitorSettings, StreamingMonitor};
use pqwatch::preprocess::ReferenceRange;
use pqwatch::sources::MockSource;
use std::sync::Mutex;
use std::time::Duration as StdDuration;
use tempfile::TempDir;

static RECORDS: Mutex<Vec<(Level, String)>> = Mutex::new(Vec::new());

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with("pqwatch")
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            RECORDS
                .lock()
                .unwrap()
                .push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

#[tokio::test]
async fn third_empty_poll_logs_a_single_warning() {
    log::set_boxed_logger(Box::new(CaptureLogger)).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let dir = TempDir::new().unwrap();
    let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let settings = MonitorSettings {
        location: "SUBSTATION_7".to_string(),
        buffer_capacity: 10,
        poll_backoff: StdDuration::ZERO,
        error_backoff: StdDuration::ZERO,
        mae_log_path: dir.path().join("mae.csv"),
        ..MonitorSettings::default()
    };
    let mut monitor = StreamingMonitor::new(
        MockSource::new(),
        ManualClock::ticking(start, Duration::seconds(8)),
        settings,
        vec![0.5; 10],
        ReferenceRange::new(0.0, 1.0).unwrap(),
    )
    .unwrap();

    for _ in 0..4 {
        let outcome = monitor.step().await.unwrap();
        assert!(matches!(outcome, IterationOutcome::EmptyPoll { .. }));
    }

    let records = RECORDS.lock().unwrap().clone();
    let warnings: Vec<&String> = records
        .iter()
        .filter(|(level, _)| *level == Level::Warn)
        .map(|(_, message)| message)
        .collect();
    assert_eq!(warnings.len(), 1, "records: {:?}", records);
    assert!(warnings[0].contains("'SUBSTATION_7'"));
    assert!(warnings[0].contains("3 consecutive polls"));

    // The other empty polls are reported at INFO
    let quiet = records
        .iter()
        .filter(|(level, message)| *level == Level::Info && message.starts_with("No new data for"))
        .count();
    assert_eq!(quiet, 3);
}
