use crate::telemetry::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One scored iteration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MaePoint {
    pub timestamp: Timestamp,
    pub mae: f64,
}

/// Rolling history of recent MAE values for the live view
#[derive(Debug, Clone)]
pub struct MaeHistory {
    points: VecDeque<MaePoint>,
    max_points: usize,
}

impl Default for MaeHistory {
    fn default() -> Self {
        Self::new(100)
    }
}

impl MaeHistory {
    pub fn new(max_points: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(max_points),
            max_points,
        }
    }

    /// Record a point, dropping the oldest beyond `max_points`
    pub fn record(&mut self, timestamp: Timestamp, mae: f64) {
        self.points.push_back(MaePoint { timestamp, mae });
        while self.points.len() > self.max_points {
            self.points.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = &MaePoint> {
        self.points.iter()
    }

    pub fn latest(&self) -> Option<&MaePoint> {
        self.points.back()
    }

    /// Smallest and largest MAE in the history
    pub fn range(&self) -> Option<(f64, f64)> {
        self.points.iter().fold(None, |acc, p| match acc {
            None => Some((p.mae, p.mae)),
            Some((lo, hi)) => Some((lo.min(p.mae), hi.max(p.mae))),
        })
    }
}
