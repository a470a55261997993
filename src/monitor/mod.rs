//! Continuous mode: the polling loop and its collaborators

/// Time source for the loop
pub mod clock;
/// Rolling MAE rendering
pub mod live_view;
/// Persisted MAE time series
pub mod mae_log;
/// Cooperative stop signal
pub mod stop;
/// The poll / accumulate / score state machine
pub mod streaming;

pub use clock::{Clock, ManualClock, SystemClock};
#[cfg(test)]
pub use live_view::MockLiveView;
pub use live_view::{sparkline, LiveView, LogLiveView};
pub use mae_log::MaeLog;
pub use stop::{stop_channel, StopHandle, StopSignal};
pub use streaming::{
    IterationOutcome, MonitorSettings, MonitorState, RunState, RunSummary, StreamingMonitor,
};
