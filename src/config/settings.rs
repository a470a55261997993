use crate::error::ConfigError;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upper bound for sample counts that are turned into wall-clock spans
pub const MAX_SPAN_SAMPLES: usize = 1_000_000;

/// Application configuration, loaded from TOML
///
/// Every section falls back to defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub windows: WindowsConfig,
    pub monitor: MonitorConfig,
    pub output: OutputConfig,
}

/// Event filtering and window extraction parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowsConfig {
    /// `W`: samples preceding the end sample of a window
    pub window_size: usize,
    pub min_separation_samples: u32,
    /// Event separation used by the per-month study
    pub study_min_separation_samples: u32,
    pub sample_period_seconds: u32,
    /// Channels carried into windows
    pub channels: Vec<String>,
    /// Channel used to trigger events; left out of the summary
    pub trigger_channel: String,
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            window_size: 300,
            min_separation_samples: 300,
            study_min_separation_samples: 50,
            sample_period_seconds: 10,
            channels: vec![
                "PowA_L1_Ins".to_string(),
                "PowF_T_Ins".to_string(),
                "THDI_L1_Ins".to_string(),
            ],
            trigger_channel: "PowA_L1_Ins".to_string(),
        }
    }
}

impl WindowsConfig {
    pub fn sample_period(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.sample_period_seconds as i64)
    }
}

/// Continuous-mode parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Location tag passed to the data source
    pub location: String,
    /// Sliding buffer capacity; scoring starts once it is full
    pub buffer_capacity: usize,
    pub poll_backoff_seconds: u64,
    pub error_backoff_seconds: u64,
    /// Consecutive empty polls before the escalated warning
    pub empty_poll_warn_threshold: u32,
    pub live_view: bool,
    /// Channel compared against the forecast
    pub target_channel: String,
    pub mae_history_len: usize,
    /// Offset of local time from UTC for the `time_local` log column
    pub local_utc_offset_minutes: i32,
    /// Column holding point predictions in the forecast file
    pub forecast_column: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            location: "MEDIA".to_string(),
            buffer_capacity: 300,
            poll_backoff_seconds: 8,
            error_backoff_seconds: 10,
            empty_poll_warn_threshold: 3,
            live_view: false,
            target_channel: "PowF_T_Ins".to_string(),
            mae_history_len: 100,
            local_utc_offset_minutes: -180,
            forecast_column: "prediction".to_string(),
        }
    }
}

/// Where artifacts are written
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub mae_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/raw"),
            mae_file: "mae_results.csv".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn mae_log_path(&self) -> PathBuf {
        self.dir.join(&self.mae_file)
    }
}

impl Config {
    /// Read and validate a configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file or use defaults
    ///
    /// A missing or unreadable file and an invalid file both fall back to
    /// defaults; the latter is reported as an error first.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match path {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                match Self::from_file(path) {
                    Ok(config) => config,
                    Err(ConfigError::ReadError(_)) => {
                        warn!(
                            "Configuration file '{}' not found or unreadable, using defaults",
                            path.display()
                        );
                        Self::default()
                    }
                    Err(e) => {
                        error!("Configuration error in '{}': {}", path.display(), e);
                        warn!("Using default configuration due to invalid config file");
                        Self::default()
                    }
                }
            }
            None => {
                info!("Using default configuration");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.windows;
        if w.window_size == 0 {
            return Err(ConfigError::ValidationError(
                "windows.window_size must be greater than 0".to_string(),
            ));
        }
        for (name, value) in [
            ("windows.window_size", w.window_size),
            (
                "windows.min_separation_samples",
                w.min_separation_samples as usize,
            ),
            (
                "windows.study_min_separation_samples",
                w.study_min_separation_samples as usize,
            ),
        ] {
            if value > MAX_SPAN_SAMPLES {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be at most {}",
                    name, MAX_SPAN_SAMPLES
                )));
            }
        }
        if w.sample_period_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "windows.sample_period_seconds must be greater than 0".to_string(),
            ));
        }
        if w.channels.is_empty() {
            return Err(ConfigError::ValidationError(
                "windows.channels must not be empty".to_string(),
            ));
        }

        let m = &self.monitor;
        if m.buffer_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "monitor.buffer_capacity must be greater than 0".to_string(),
            ));
        }
        if m.empty_poll_warn_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "monitor.empty_poll_warn_threshold must be greater than 0".to_string(),
            ));
        }
        if m.mae_history_len == 0 {
            return Err(ConfigError::ValidationError(
                "monitor.mae_history_len must be greater than 0".to_string(),
            ));
        }
        if !w.channels.contains(&m.target_channel) {
            return Err(ConfigError::ValidationError(format!(
                "monitor.target_channel '{}' is not one of windows.channels",
                m.target_channel
            )));
        }
        if m.local_utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::ValidationError(
                "monitor.local_utc_offset_minutes must be within one day".to_string(),
            ));
        }
        Ok(())
    }
}
