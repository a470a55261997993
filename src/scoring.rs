//! Forecast error scoring for the live buffer
//!
//! Scoring is a pure function of the buffer, the forecast series and the
//! reference range; the monitor owns all of the side effects around it.

use crate::error::ScoringError;
use crate::preprocess::{preprocess, ReferenceRange};
use crate::telemetry::{Sample, Timestamp};

/// Result of scoring one buffer snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub mae: f64,
    /// Number of aligned positions that contributed
    pub positions: usize,
    /// Timestamp of the newest scored sample
    pub timestamp: Timestamp,
}

/// Mean absolute error of two equally long series
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> Result<f64, ScoringError> {
    if actual.len() != predicted.len() {
        return Err(ScoringError::LengthMismatch {
            buffer: actual.len(),
            forecast: predicted.len(),
        });
    }
    if actual.is_empty() {
        return Err(ScoringError::EmptyBuffer);
    }
    let total: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum();
    Ok(total / actual.len() as f64)
}

/// Score a buffer snapshot against the normalised forecast
///
/// The buffer is cleaned quietly, aligned positionally with the first
/// `min(len, capacity)` forecast values, and the forecast is brought back to
/// physical units with `reference` before computing the MAE of `target_channel`.
pub fn score_buffer(
    buffer: &[Sample],
    forecast: &[f64],
    reference: &ReferenceRange,
    target_channel: &str,
    capacity: usize,
) -> Result<Score, ScoringError> {
    let (processed, _) = preprocess(buffer, true);
    let Some(last) = processed.last() else {
        return Err(ScoringError::EmptyBuffer);
    };

    let n = processed.len().min(capacity);
    let slice = &forecast[..n.min(forecast.len())];
    if processed.len() != slice.len() {
        return Err(ScoringError::LengthMismatch {
            buffer: processed.len(),
            forecast: slice.len(),
        });
    }

    let actual = processed
        .iter()
        .map(|s| {
            s.value(target_channel).ok_or_else(|| {
                ScoringError::MissingChannel(s.timestamp.to_rfc3339(), target_channel.to_string())
            })
        })
        .collect::<Result<Vec<f64>, _>>()?;
    let predicted: Vec<f64> = slice.iter().map(|p| reference.denormalize(*p)).collect();

    Ok(Score {
        mae: mean_absolute_error(&actual, &predicted)?,
        positions: n,
        timestamp: last.timestamp,
    })
}
