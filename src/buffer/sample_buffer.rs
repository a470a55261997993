//! Sliding sample buffer for the streaming monitor
//!
//! Holds the most recent samples up to a fixed capacity. When capacity is
//! exceeded the oldest samples are evicted first, so the newest samples are
//! always retained in arrival order.

use crate::telemetry::{Sample, Timestamp};
use std::collections::VecDeque;

/// Bounded FIFO of samples
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SampleBuffer {
    /// Create an empty buffer holding at most `capacity` samples
    ///
    /// # Examples
    ///
    /// ```
    /// use pqwatch::buffer::SampleBuffer;
    ///
    /// let buffer = SampleBuffer::new(300);
    /// assert!(buffer.is_empty());
    /// ```
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append samples and evict from the front down to capacity
    ///
    /// # Returns
    ///
    /// Number of samples evicted
    pub fn extend<I: IntoIterator<Item = Sample>>(&mut self, samples: I) -> usize {
        self.samples.extend(samples);
        self.enforce_capacity()
    }

    /// Append one sample, evicting the oldest if full
    pub fn push(&mut self, sample: Sample) -> usize {
        self.samples.push_back(sample);
        self.enforce_capacity()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True once the buffer holds `capacity` samples
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Snapshot of the buffer contents in arrival order
    pub fn to_vec(&self) -> Vec<Sample> {
        self.samples.iter().cloned().collect()
    }

    pub fn latest_timestamp(&self) -> Option<Timestamp> {
        self.samples.back().map(|s| s.timestamp)
    }

    fn enforce_capacity(&mut self) -> usize {
        let excess = self.samples.len().saturating_sub(self.capacity);
        self.samples.drain(..excess);
        excess
    }
}


// Property-based tests
#[cfg(test)]
mod property_tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    /// Buffer capacity between 1 and 100
    #[derive(Debug, Clone)]
    struct BufferCapacity(usize);

    impl Arbitrary for BufferCapacity {
        fn arbitrary(g: &mut Gen) -> Self {
            BufferCapacity((u8::arbitrary(g) % 100 + 1) as usize)
        }
    }

    /// Batch sizes of successive polls
    #[derive(Debug, Clone)]
    struct PollBatches(Vec<usize>);

    impl Arbitrary for PollBatches {
        fn arbitrary(g: &mut Gen) -> Self {
            let polls = usize::arbitrary(g) % 60;
            PollBatches((0..polls).map(|_| usize::arbitrary(g) % 8).collect())
        }
    }

    #[quickcheck]
    fn prop_buffer_keeps_most_recent_in_order(
        capacity: BufferCapacity,
        batches: PollBatches,
    ) -> bool {
        let mut buffer = SampleBuffer::new(capacity.0);
        let mut next = 0i64;
        let mut within_capacity = true;

        for size in &batches.0 {
            let batch: Vec<Sample> = (0..*size)
                .map(|_| {
                    next += 1;
                    Sample::new(Utc.timestamp_opt(next, 0).unwrap(), [("x", next as f64)])
                })
                .collect();
            buffer.extend(batch);
            within_capacity &= buffer.len() <= capacity.0;
        }

        let total = next as usize;
        let kept = total.min(capacity.0);
        let expected: Vec<f64> = ((total - kept + 1)..=total).map(|i| i as f64).collect();
        let actual: Vec<f64> = buffer.iter().map(|s| s.value("x").unwrap()).collect();

        within_capacity && actual == expected
    }
}
