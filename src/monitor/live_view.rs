use crate::buffer::MaeHistory;
use log::info;

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Renders the rolling MAE history after each scored iteration
#[cfg_attr(test, mockall::automock)]
pub trait LiveView: Send {
    fn render(&mut self, history: &MaeHistory);
}

/// Live view that logs a one-line sparkline of the history
#[derive(Debug, Default)]
pub struct LogLiveView;

impl LiveView for LogLiveView {
    fn render(&mut self, history: &MaeHistory) {
        if let Some(latest) = history.latest() {
            info!(
                "MAE {:.4} at {} {} ({} points)",
                latest.mae,
                latest.timestamp.format("%H:%M:%S"),
                sparkline(history),
                history.len()
            );
        }
    }
}

/// Scale every point of the history onto eight bar heights
pub fn sparkline(history: &MaeHistory) -> String {
    let Some((lo, hi)) = history.range() else {
        return String::new();
    };
    let span = hi - lo;
    history
        .points()
        .map(|p| {
            if span <= 0.0 || !span.is_finite() {
                BARS[0]
            } else {
                let level = ((p.mae - lo) / span * (BARS.len() - 1) as f64).round() as usize;
                BARS[level.min(BARS.len() - 1)]
            }
        })
        .collect()
}
