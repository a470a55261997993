//! Continuous forecast-error monitor
//!
//! Each iteration polls the data source for `(last_poll_time, now]`, appends
//! what arrived to the sliding buffer, and once the buffer is full scores it
//! against the forecast and appends the MAE to the log. Recoverable conditions
//! come back as an [`IterationOutcome`] followed by a backoff; a data source
//! failure ends the run with [`MonitorError::Fatal`].

use crate::buffer::{MaeHistory, SampleBuffer};
use crate::config::Config;
use crate::error::{MonitorError, ScoringError};
use crate::monitor::{Clock, LiveView, LogLiveView, MaeLog, StopSignal};
use crate::preprocess::ReferenceRange;
use crate::scoring::score_buffer;
use crate::sources::DataSource;
use crate::telemetry::Timestamp;
use chrono::{FixedOffset, Offset, Utc};
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime parameters of one monitor instance
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub location: String,
    /// `MAX_ST`
    pub buffer_capacity: usize,
    pub poll_backoff: Duration,
    pub error_backoff: Duration,
    pub empty_poll_warn_threshold: u32,
    pub live_view: bool,
    pub target_channel: String,
    pub mae_history_len: usize,
    pub local_offset: FixedOffset,
    pub mae_log_path: PathBuf,
}

impl MonitorSettings {
    pub fn from_config(config: &Config) -> Self {
        let m = &config.monitor;
        Self {
            location: m.location.clone(),
            buffer_capacity: m.buffer_capacity,
            poll_backoff: Duration::from_secs(m.poll_backoff_seconds),
            error_backoff: Duration::from_secs(m.error_backoff_seconds),
            empty_poll_warn_threshold: m.empty_poll_warn_threshold,
            live_view: m.live_view,
            target_channel: m.target_channel.clone(),
            mae_history_len: m.mae_history_len,
            local_offset: FixedOffset::east_opt(m.local_utc_offset_minutes * 60)
                .unwrap_or_else(|| Utc.fix()),
            mae_log_path: config.output.mae_log_path(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Where the loop is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Init,
    Polling,
    Accumulating,
    Scoring,
    /// Stopped on request
    Stopped,
    /// Ended by an unrecoverable error
    Terminated,
}

/// What a single iteration did
#[derive(Debug, Clone, PartialEq)]
pub enum IterationOutcome {
    /// No time has elapsed since the last successful poll
    InvalidRange,
    EmptyPoll { consecutive: u32, escalated: bool },
    /// Samples arrived but the buffer is not full yet
    Accumulating { received: usize, buffered: usize },
    Scored { mae: f64 },
    /// Scoring failed for this iteration only
    Skipped(ScoringError),
    /// The MAE was computed but could not be written
    PersistFailed(String),
}

/// Mutable state owned by one loop instance
#[derive(Debug)]
pub struct RunState {
    pub last_poll_time: Timestamp,
    pub consecutive_empty_polls: u32,
    pub buffer: SampleBuffer,
    pub mae_history: MaeHistory,
    pub iterations: u64,
    pub scored: u64,
    pub escalations: u64,
    pub skipped: u64,
}

impl RunState {
    fn new(now: Timestamp, capacity: usize, history_len: usize) -> Self {
        Self {
            last_poll_time: now,
            consecutive_empty_polls: 0,
            buffer: SampleBuffer::new(capacity),
            mae_history: MaeHistory::new(history_len),
            iterations: 0,
            scored: 0,
            escalations: 0,
            skipped: 0,
        }
    }
}

/// Totals reported when a run stops on request
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub iterations: u64,
    pub scored: u64,
    pub escalations: u64,
    pub skipped: u64,
    pub last_mae: Option<f64>,
}

pub struct StreamingMonitor<S: DataSource, C: Clock> {
    source: S,
    clock: C,
    settings: MonitorSettings,
    /// Normalised point predictions, aligned positionally with the buffer
    forecast: Vec<f64>,
    reference: ReferenceRange,
    mae_log: MaeLog,
    live_view: Box<dyn LiveView>,
    state: MonitorState,
    run: RunState,
}

impl<S: DataSource, C: Clock> StreamingMonitor<S, C> {
    /// Initialise the run state at `clock.now()` and open the MAE log
    pub fn new(
        source: S,
        clock: C,
        settings: MonitorSettings,
        forecast: Vec<f64>,
        reference: ReferenceRange,
    ) -> Result<Self, MonitorError> {
        let mae_log = MaeLog::open(&settings.mae_log_path, settings.local_offset)?;
        let run = RunState::new(
            clock.now(),
            settings.buffer_capacity,
            settings.mae_history_len,
        );

        if forecast.len() < settings.buffer_capacity {
            warn!(
                "Forecast has {} values but the buffer holds {}; every score will be skipped",
                forecast.len(),
                settings.buffer_capacity
            );
        }

        Ok(Self {
            source,
            clock,
            settings,
            forecast,
            reference,
            mae_log,
            live_view: Box::new(LogLiveView),
            state: MonitorState::Init,
            run,
        })
    }

    /// Replace the default live view
    pub fn with_live_view(mut self, view: Box<dyn LiveView>) -> Self {
        self.live_view = view;
        self
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn run_state(&self) -> &RunState {
        &self.run
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Run one poll / accumulate / score cycle without sleeping
    pub async fn step(&mut self) -> Result<IterationOutcome, MonitorError> {
        self.run.iterations += 1;
        self.state = MonitorState::Polling;

        let now = self.clock.now();
        let since = self.run.last_poll_time;
        if now <= since {
            debug!("No time elapsed since last poll at {}", since);
            return Ok(IterationOutcome::InvalidRange);
        }

        let rows = match self
            .source
            .poll(since, now, &self.settings.location)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                error!(
                    "Data source '{}' failed on iteration {}: {}",
                    self.source.name(),
                    self.run.iterations,
                    e
                );
                self.state = MonitorState::Terminated;
                return Err(MonitorError::Fatal {
                    iteration: self.run.iterations,
                    source: e,
                });
            }
        };

        if rows.is_empty() {
            self.run.consecutive_empty_polls += 1;
            let consecutive = self.run.consecutive_empty_polls;
            let escalated = consecutive == self.settings.empty_poll_warn_threshold;
            if escalated {
                self.run.escalations += 1;
                warn!(
                    "No new data from '{}' for {} consecutive polls",
                    self.settings.location, consecutive
                );
            } else {
                info!("No new data for ({}, {}]", since, now);
            }
            return Ok(IterationOutcome::EmptyPoll {
                consecutive,
                escalated,
            });
        }

        self.run.consecutive_empty_polls = 0;
        self.run.last_poll_time = now;
        let received = rows.len();
        let evicted = self.run.buffer.extend(rows);
        if evicted > 0 {
            debug!("Evicted {} oldest samples", evicted);
        }

        if !self.run.buffer.is_full() {
            self.state = MonitorState::Accumulating;
            info!(
                "Accumulating: {}/{} samples",
                self.run.buffer.len(),
                self.settings.buffer_capacity
            );
            return Ok(IterationOutcome::Accumulating {
                received,
                buffered: self.run.buffer.len(),
            });
        }

        self.state = MonitorState::Scoring;
        Ok(self.score())
    }

    /// Score the full buffer; the point is stamped with the newest scored sample's time
    fn score(&mut self) -> IterationOutcome {
        let snapshot = self.run.buffer.to_vec();
        let score = match score_buffer(
            &snapshot,
            &self.forecast,
            &self.reference,
            &self.settings.target_channel,
            self.settings.buffer_capacity,
        ) {
            Ok(score) => score,
            Err(e) => {
                self.run.skipped += 1;
                warn!("Skipping score: {}", e);
                return IterationOutcome::Skipped(e);
            }
        };

        self.run.scored += 1;
        self.run.mae_history.record(score.timestamp, score.mae);
        info!("MAE {:.4} over {} samples", score.mae, score.positions);

        if self.settings.live_view {
            self.live_view.render(&self.run.mae_history);
        }

        match self.mae_log.append(score.timestamp, score.mae) {
            Ok(()) => IterationOutcome::Scored { mae: score.mae },
            Err(e) => {
                warn!(
                    "Failed to append to MAE log {}: {}",
                    self.mae_log.path().display(),
                    e
                );
                IterationOutcome::PersistFailed(e.to_string())
            }
        }
    }

    /// Delay before the next iteration
    pub fn backoff_for(&self, outcome: &IterationOutcome) -> Duration {
        match outcome {
            IterationOutcome::Skipped(ScoringError::LengthMismatch { .. }) => {
                self.settings.poll_backoff
            }
            IterationOutcome::Skipped(_) | IterationOutcome::PersistFailed(_) => {
                self.settings.error_backoff
            }
            _ => self.settings.poll_backoff,
        }
    }

    /// Loop until stopped or a fatal error
    pub async fn run(&mut self, mut stop: StopSignal) -> Result<RunSummary, MonitorError> {
        info!(
            "Monitoring '{}' via {} (buffer {}, target {})",
            self.settings.location,
            self.source.name(),
            self.settings.buffer_capacity,
            self.settings.target_channel
        );

        while !stop.is_stopped() {
            let outcome = self.step().await?;
            let delay = self.backoff_for(&outcome);

            if delay.is_zero() {
                tokio::task::yield_now().await;
                continue;
            }
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop.stopped() => break,
            }
        }

        self.state = MonitorState::Stopped;
        let summary = self.summary();
        info!(
            "Monitor stopped after {} iterations ({} scored)",
            summary.iterations, summary.scored
        );
        Ok(summary)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            iterations: self.run.iterations,
            scored: self.run.scored,
            escalations: self.run.escalations,
            skipped: self.run.skipped,
            last_mae: self.run.mae_history.latest().map(|p| p.mae),
        }
    }
}
