use crate::error::SourceError;
use crate::sources::{DataSource, PollFuture};
use crate::telemetry::{Sample, Timestamp};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A recorded call to [`MockSource::poll`]
#[derive(Debug, Clone, PartialEq)]
pub struct PollCall {
    pub start: Timestamp,
    pub end: Timestamp,
    pub location: String,
}

/// Scripted data source
///
/// Responses are handed out in order; once the script is exhausted every poll
/// returns no rows. Clones share the script and the call log.
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    responses: Arc<Mutex<VecDeque<Result<Vec<Sample>, SourceError>>>>,
    calls: Arc<Mutex<Vec<PollCall>>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source that answers with the given responses in order
    ///
    /// # Example
    /// ```
    /// use pqwatch::sources::MockSource;
    ///
    /// let source = MockSource::with_responses(vec![Ok(vec![]), Ok(vec![])]);
    /// assert_eq!(source.remaining(), 2);
    /// ```
    pub fn with_responses(responses: Vec<Result<Vec<Sample>, SourceError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of polls received so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn calls(&self) -> Vec<PollCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl DataSource for MockSource {
    fn poll<'a>(&'a self, start: Timestamp, end: Timestamp, location: &'a str) -> PollFuture<'a> {
        Box::pin(async move {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(PollCall {
                    start,
                    end,
                    location: location.to_string(),
                });
            }

            let next = self
                .responses
                .lock()
                .ok()
                .and_then(|mut responses| responses.pop_front());
            next.unwrap_or_else(|| Ok(Vec::new()))
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_mock_source_replays_script_then_goes_quiet() {
        let t0 = Utc.timestamp_opt(0, 0).unwrap();
        let t1 = Utc.timestamp_opt(10, 0).unwrap();
        let sample = Sample::new(t1, [("PowF_T_Ins", 0.9)]);
        let source = MockSource::with_responses(vec![
            Ok(vec![sample.clone()]),
            Err(SourceError::Unavailable("down".to_string())),
        ]);

        assert_eq!(source.poll(t0, t1, "MEDIA").await.unwrap(), vec![sample]);
        assert!(source.poll(t0, t1, "MEDIA").await.is_err());
        assert!(source.poll(t0, t1, "MEDIA").await.unwrap().is_empty());

        assert_eq!(source.call_count(), 3);
        assert_eq!(source.calls()[0].location, "MEDIA");
    }
}
