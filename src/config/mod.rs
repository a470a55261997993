/// TOML configuration with defaults and validation
pub mod settings;

pub use settings::{Config, MonitorConfig, OutputConfig, WindowsConfig};
