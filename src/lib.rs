/// Error types for every concern of the crate
pub mod error;

/// Samples, label rows, events and window classes
pub mod telemetry;

/// Minimum-separation anomaly event filter
pub mod filter;

/// Anomalous/normal window extraction and class summaries
pub mod windows;

/// Bounded sample buffer and MAE history
pub mod buffer;

/// Sample cleaning and normalisation
pub mod preprocess;

/// Forecast rescaling and error scoring
pub mod scoring;

/// Data sources polled by the monitor
pub mod sources;

/// Streaming forecast-error monitor
pub mod monitor;

/// CSV datasets
pub mod dataset;

/// Batch extraction pipeline
pub mod batch;

/// Configuration management
pub mod config;

// Re-export commonly used types
pub use error::{ConfigError, DatasetError, MonitorError, PersistError, ScoringError, SourceError};
pub use filter::{filter_unique_events, EventFilter};
pub use monitor::StreamingMonitor;
pub use telemetry::{AnomalyEvent, LabelRow, Sample, Timestamp, WindowClass};
pub use windows::{ClassSummary, Extraction, Window, WindowExtractor};
