//! Data sources the streaming monitor polls for fresh samples

/// Replay of a recorded samples file as if it were live
pub mod csv_replay;
/// Scripted source for tests and dry runs
pub mod mock;

pub use csv_replay::CsvReplaySource;
pub use mock::MockSource;

use crate::error::SourceError;
use crate::telemetry::{Sample, Timestamp};
use std::future::Future;
use std::pin::Pin;

/// Future returned by [`DataSource::poll`]
pub type PollFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Sample>, SourceError>> + Send + 'a>>;

/// Trait for anything that can be polled for samples in a time range
///
/// Implementations return every sample with a timestamp in `(start, end]` for
/// the given location, in timestamp order. No new data is an empty vector,
/// never an error.
pub trait DataSource: Send + Sync {
    fn poll<'a>(&'a self, start: Timestamp, end: Timestamp, location: &'a str) -> PollFuture<'a>;

    /// Human-readable name for logging
    fn name(&self) -> &str;
}
