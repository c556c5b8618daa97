//! Reading log and trailing averages
//!
//! Append-only, arrival-ordered store of [`Sample`]s. All threshold
//! evaluation in the engine is computed from trailing averages over this log.

use crate::domain::Sample;
use std::collections::VecDeque;

/// Ordered sequence of samples with optional retention cap
///
/// With a retention cap the oldest samples are evicted once the cap is
/// exceeded; arrival order is never changed.
#[derive(Debug, Clone, Default)]
pub struct ReadingLog {
    samples: VecDeque<Sample>,
    retention: Option<usize>,
    total_appended: u64,
}

impl ReadingLog {
    /// Create an unbounded log
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log that keeps at most `retention` samples
    pub fn with_retention(retention: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(retention.min(4096)),
            retention: Some(retention),
            total_appended: 0,
        }
    }

    /// Append a sample at the end of the log
    pub fn append(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        self.total_appended += 1;
        self.evict();
    }

    /// Number of samples currently stored
    pub fn count(&self) -> usize {
        self.samples.len()
    }

    /// Whether the log holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of samples ever appended, including evicted ones
    pub fn total_appended(&self) -> u64 {
        self.total_appended
    }

    /// Most recent sample
    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Iterate samples oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Current retention cap
    pub fn retention(&self) -> Option<usize> {
        self.retention
    }

    /// Change the retention cap, evicting immediately if it shrank
    pub fn set_retention(&mut self, retention: Option<usize>) {
        self.retention = retention;
        self.evict();
    }

    /// Trailing average of CPU usage over the last `n` samples
    ///
    /// Returns `None` for `n == 0`. See [`ReadingLog::trailing_average`].
    pub fn trailing_average_cpu(&self, n: usize) -> Option<u32> {
        self.trailing_average(n, |s| s.average_cpu)
    }

    /// Trailing average of memory usage over the last `n` samples
    pub fn trailing_average_ram(&self, n: usize) -> Option<u32> {
        self.trailing_average(n, |s| s.average_memory)
    }

    /// Sum of the last `min(n, count)` values divided by `n`, truncating
    ///
    /// The divisor is always `n`: callers gate on `count() >= n` before
    /// treating the result as a full-window average.
    pub fn trailing_average<F>(&self, n: usize, field: F) -> Option<u32>
    where
        F: Fn(&Sample) -> u32,
    {
        if n == 0 {
            return None;
        }

        let sum: u64 = self
            .samples
            .iter()
            .rev()
            .take(n)
            .map(|s| u64::from(field(s)))
            .sum();

        Some((sum / n as u64) as u32)
    }

    fn evict(&mut self) {
        if let Some(cap) = self.retention {
            while self.samples.len() > cap {
                self.samples.pop_front();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample(cpu: u32, ram: u32) -> Sample {
        Sample::new(cpu, ram, Duration::from_secs(60))
    }

    #[test]
    fn test_append_and_count() {
        let mut log = ReadingLog::new();
        assert!(log.is_empty());

        log.append(sample(0, 0));
        log.append(sample(1, 1));
        log.append(sample(2, 2));

        assert_eq!(log.count(), 3);
        assert_eq!(log.last().unwrap().average_cpu, 2);
    }

    #[test]
    fn test_trailing_average_cpu() {
        let mut log = ReadingLog::new();
        for cpu in [35, 60, 25] {
            log.append(sample(cpu, 0));
        }

        assert_eq!(log.trailing_average_cpu(1), Some(25));
        assert_eq!(log.trailing_average_cpu(2), Some((25 + 60) / 2));
        assert_eq!(log.trailing_average_cpu(3), Some((35 + 60 + 25) / 3));
    }

    #[test]
    fn test_trailing_average_ram() {
        let mut log = ReadingLog::new();
        for ram in [40, 41, 44] {
            log.append(sample(0, ram));
        }

        assert_eq!(log.trailing_average_ram(2), Some(42));
        assert_eq!(log.trailing_average_ram(3), Some(41));
    }

    #[test]
    fn test_short_log_divides_by_requested_window() {
        let mut log = ReadingLog::new();
        log.append(sample(90, 30));

        // One sample of 90 averaged "over 3" is 30, not 90.
        assert_eq!(log.trailing_average_cpu(3), Some(30));
        assert_eq!(log.trailing_average_ram(3), Some(10));
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut log = ReadingLog::new();
        log.append(sample(50, 50));
        assert_eq!(log.trailing_average_cpu(0), None);
        assert_eq!(log.trailing_average_ram(0), None);
    }

    #[test]
    fn test_retention_evicts_oldest() {
        let mut log = ReadingLog::with_retention(2);
        log.append(sample(10, 0));
        log.append(sample(20, 0));
        log.append(sample(30, 0));

        assert_eq!(log.count(), 2);
        assert_eq!(log.total_appended(), 3);
        let cpus: Vec<u32> = log.iter().map(|s| s.average_cpu).collect();
        assert_eq!(cpus, vec![20, 30]);
    }

    #[test]
    fn test_shrinking_retention_evicts_immediately() {
        let mut log = ReadingLog::new();
        for cpu in 0..10 {
            log.append(sample(cpu, 0));
        }
        log.set_retention(Some(4));
        assert_eq!(log.count(), 4);
        assert_eq!(log.iter().next().unwrap().average_cpu, 6);
    }
}
