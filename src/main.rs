use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use pqwatch::batch;
use pqwatch::config::Config;
use pqwatch::dataset;
use pqwatch::monitor::{stop_channel, MonitorSettings, StreamingMonitor, SystemClock};
use pqwatch::preprocess::{preprocess, ReferenceRange};
use pqwatch::sources::CsvReplaySource;
use std::path::{Path, PathBuf};

/// Command-line arguments for the power-quality watcher
#[derive(Parser)]
#[command(
    name = "pqwatch",
    about = "Power-quality anomaly windows and streaming forecast-error monitoring",
    long_about = "Extracts anomalous and normal context windows around detector-flagged events \
                  in electrical telemetry, and continuously scores a forecast against live \
                  samples, logging the mean absolute error."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract anomalous and normal windows from a samples file and its labels
    Extract {
        /// Samples CSV (`time` column plus one column per channel)
        #[arg(long, value_name = "FILE")]
        samples: PathBuf,

        /// Detector label CSV (`time` column plus one boolean column per channel)
        #[arg(long, value_name = "FILE")]
        labels: PathBuf,

        /// Output directory, defaults to `output.dir` from the configuration
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Min/max normalise channels before extracting
        #[arg(long)]
        normalize: bool,
    },

    /// Extract month by month and tabulate one summary row per month
    Study {
        /// Samples CSV spanning one or more calendar months
        #[arg(long, value_name = "FILE")]
        samples: PathBuf,

        /// Detector label CSV for the same period
        #[arg(long, value_name = "FILE")]
        labels: PathBuf,

        /// Output directory, defaults to `output.dir` from the configuration
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Min/max normalise each month before extracting
        #[arg(long)]
        normalize: bool,
    },

    /// Score a forecast against a replayed sample stream until interrupted
    Monitor {
        /// Samples CSV replayed as the live data source
        #[arg(long, value_name = "FILE")]
        replay: PathBuf,

        /// Forecast CSV holding normalised point predictions
        #[arg(long, value_name = "FILE")]
        forecast: PathBuf,

        /// Forecast column, defaults to `monitor.forecast_column`
        #[arg(long, value_name = "NAME")]
        forecast_column: Option<String>,

        /// Clean, unnormalised dataset whose target range rescales the forecast
        #[arg(long, value_name = "FILE")]
        reference: PathBuf,

        /// Render the rolling MAE after each score
        #[arg(long)]
        live_view: bool,
    },
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// # Returns
    ///
    /// `Ok(())` if all arguments are valid, `Err(String)` with error message otherwise
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults in Config::load_or_default
            if config_path.exists() {
                if !config_path.is_file() {
                    return Err(format!(
                        "Configuration path is not a file: {}",
                        config_path.display()
                    ));
                }

                if let Some(extension) = config_path.extension() {
                    if extension != "toml" {
                        warn!(
                            "Configuration file does not have .toml extension: {}",
                            config_path.display()
                        );
                    }
                }
            }
        }

        let inputs: Vec<&Path> = match &self.command {
            Command::Extract {
                samples, labels, ..
            }
            | Command::Study {
                samples, labels, ..
            } => vec![samples.as_path(), labels.as_path()],
            Command::Monitor {
                replay,
                forecast,
                reference,
                ..
            } => vec![replay.as_path(), forecast.as_path(), reference.as_path()],
        };
        for input in inputs {
            if input.is_dir() {
                return Err(format!("Input path is a directory: {}", input.display()));
            }
        }

        Ok(())
    }
}

fn run_extract(
    config: &Config,
    samples: &Path,
    labels: &Path,
    output: Option<&Path>,
    normalize: bool,
) -> Result<()> {
    let out_dir = output.unwrap_or(config.output.dir.as_path());
    let report = batch::run(&config.windows, samples, labels, out_dir, normalize)
        .context("Batch extraction failed")?;

    let extraction = &report.extraction;
    info!(
        "{} events, {} anomalous windows, {} normal windows ({} events not in samples, {} too early)",
        report.events.len(),
        extraction.anomalous_count,
        extraction.normal.len(),
        extraction.missing_events,
        extraction.early_events
    );
    for path in &report.written {
        info!("  {}", path.display());
    }
    Ok(())
}

fn run_study(
    config: &Config,
    samples: &Path,
    labels: &Path,
    output: Option<&Path>,
    normalize: bool,
) -> Result<()> {
    let out_dir = output.unwrap_or(config.output.dir.as_path());
    let report = batch::run_study(&config.windows, samples, labels, out_dir, normalize)
        .context("Anomaly study failed")?;

    for month in &report.months {
        info!("{}: {} anomalous windows", month.label(), month.anomalous_count);
    }
    info!("  {}", report.written.display());
    Ok(())
}

fn run_monitor(
    config: &Config,
    replay: &Path,
    forecast_path: &Path,
    forecast_column: Option<&str>,
    reference_path: &Path,
    live_view: bool,
) -> Result<()> {
    let mut settings = MonitorSettings::from_config(config);
    settings.live_view |= live_view;

    let column = forecast_column.unwrap_or(config.monitor.forecast_column.as_str());
    let forecast = dataset::read_forecast(forecast_path, column)
        .with_context(|| format!("Failed to read forecast {}", forecast_path.display()))?;

    let reference_samples = dataset::read_samples(reference_path)
        .with_context(|| format!("Failed to read reference {}", reference_path.display()))?;
    let (reference_clean, _) = preprocess(&reference_samples, false);
    let reference = ReferenceRange::from_samples(&reference_clean, &settings.target_channel)
        .ok_or_else(|| {
            anyhow!(
                "Reference dataset has no values for '{}'",
                settings.target_channel
            )
        })?;
    info!(
        "Reference range for {}: [{}, {}]",
        settings.target_channel, reference.min, reference.max
    );

    let source = CsvReplaySource::from_path(replay)
        .with_context(|| format!("Failed to load replay {}", replay.display()))?;
    let mut monitor = StreamingMonitor::new(source, SystemClock, settings, forecast, reference)?;

    let (stop_handle, stop_signal) = stop_channel();
    ctrlc::set_handler(move || {
        info!("Received interrupt signal (SIGINT), shutting down gracefully...");
        stop_handle.stop();
    })
    .context("Error setting SIGINT handler for graceful shutdown")?;

    info!("Monitor is running. Press Ctrl+C to stop.");
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let summary = runtime.block_on(monitor.run(stop_signal))?;
    info!(
        "Scored {} of {} iterations, last MAE {:?}",
        summary.scored, summary.iterations, summary.last_mae
    );
    Ok(())
}

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    } else if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let config = Config::load_or_default(cli.config.as_deref());

    let result = match &cli.command {
        Command::Extract {
            samples,
            labels,
            output,
            normalize,
        } => run_extract(&config, samples, labels, output.as_deref(), *normalize),
        Command::Study {
            samples,
            labels,
            output,
            normalize,
        } => run_study(&config, samples, labels, output.as_deref(), *normalize),
        Command::Monitor {
            replay,
            forecast,
            forecast_column,
            reference,
            live_view,
        } => run_monitor(
            &config,
            replay,
            forecast,
            forecast_column.as_deref(),
            reference,
            *live_view,
        ),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
