use thiserror::Error;

/// Errors raised by a data source while polling for new samples
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Data source unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid poll range: {start} is not before {end}")]
    InvalidRange { start: String, end: String },
}

/// Errors that can occur while scoring the live buffer against the forecast
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("Length mismatch: processed buffer has {buffer} rows, forecast slice has {forecast}")]
    LengthMismatch { buffer: usize, forecast: usize },

    #[error("Sample at {0} has no value for channel '{1}'")]
    MissingChannel(String, String),

    #[error("Nothing left to score after preprocessing")]
    EmptyBuffer,

    #[error("Reference range is degenerate: min {min} > max {max}")]
    InvalidReference { min: f64, max: f64 },
}

/// Errors that can occur when persisting the MAE time series
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Errors that can occur while reading or writing batch datasets
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Dataset file not found: {0}")]
    NotFound(String),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("No samples for {0}")]
    EmptyPeriod(String),

    #[error("Invalid value '{value}' in column '{column}' at row {row}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Errors that end a streaming monitor run
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Failed to open MAE log: {0}")]
    Setup(#[from] PersistError),

    #[error("Fatal error on iteration {iteration}: {source}")]
    Fatal {
        iteration: u64,
        #[source]
        source: SourceError,
    },
}
