//! Host sampling
//!
//! Raw CPU/RAM readings are taken at a fixed cadence and reduced into
//! [`Sample`]s for the alert engine. Per-process statistics back the
//! optional top-offender line in peak notifications.

pub mod host;
pub mod process;

pub use host::HostSampler;
pub use process::ProcessMonitor;

use crate::domain::{ProcessUsage, Sample};
use crate::error::SamplerError;
use chrono::{DateTime, Local};
use std::time::Duration;

/// One instantaneous reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawReading {
    /// Global CPU usage in percent
    pub cpu_percent: f32,
    /// Used memory in percent of total
    pub memory_percent: f32,
}

/// Source of raw readings
///
/// Abstracts the OS so the reducer and monitor loop can run on fixed data.
pub trait ResourceSampler {
    fn sample(&mut self) -> Result<RawReading, SamplerError>;
}

/// Ranks processes by averaged resource usage
pub trait ProcessRanking: Send + Sync {
    /// Process with the highest CPU average over its last `window` entries
    fn highest_cpu_consumer(&self, window: usize) -> Option<ProcessUsage>;

    /// Process with the highest memory average over its last `window` entries
    fn highest_ram_consumer(&self, window: usize) -> Option<ProcessUsage>;
}

/// Reduces a fixed number of raw readings into one [`Sample`]
#[derive(Debug, Clone)]
pub struct SampleReducer {
    readings_per_sample: usize,
    interval: Duration,
    buffer: Vec<RawReading>,
}

impl SampleReducer {
    /// Create a reducer averaging `readings_per_sample` readings taken every `interval`
    pub fn new(readings_per_sample: usize, interval: Duration) -> Self {
        let readings_per_sample = readings_per_sample.max(1);
        Self {
            readings_per_sample,
            interval,
            buffer: Vec::with_capacity(readings_per_sample),
        }
    }

    /// Time covered by one emitted sample
    pub fn window_duration(&self) -> Duration {
        self.interval * self.readings_per_sample as u32
    }

    /// Add a reading; returns a sample once the buffer is full
    pub fn push(&mut self, reading: RawReading, now: DateTime<Local>) -> Option<Sample> {
        self.buffer.push(reading);
        if self.buffer.len() < self.readings_per_sample {
            return None;
        }

        let n = self.buffer.len() as f32;
        let cpu: f32 = self.buffer.iter().map(|r| r.cpu_percent).sum();
        let memory: f32 = self.buffer.iter().map(|r| r.memory_percent).sum();
        self.buffer.clear();

        Some(Sample::at(
            (cpu / n) as u32,
            (memory / n) as u32,
            now,
            self.window_duration(),
        ))
    }

    /// Readings collected toward the next sample
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(cpu: f32, memory: f32) -> RawReading {
        RawReading {
            cpu_percent: cpu,
            memory_percent: memory,
        }
    }

    #[test]
    fn test_reducer_emits_after_full_buffer() {
        let mut reducer = SampleReducer::new(3, Duration::from_secs(10));
        let now = Local::now();

        assert!(reducer.push(reading(10.0, 50.0), now).is_none());
        assert!(reducer.push(reading(20.0, 50.0), now).is_none());
        assert_eq!(reducer.pending(), 2);

        let sample = reducer.push(reading(35.0, 52.0), now).unwrap();
        assert_eq!(sample.average_cpu, 21);
        assert_eq!(sample.average_memory, 50);
        assert_eq!(sample.window_duration, Duration::from_secs(30));
        assert_eq!(reducer.pending(), 0);
    }

    #[test]
    fn test_reducer_truncates() {
        let mut reducer = SampleReducer::new(2, Duration::from_secs(1));
        let now = Local::now();
        reducer.push(reading(99.9, 0.9), now);
        let sample = reducer.push(reading(99.9, 0.9), now).unwrap();
        assert_eq!(sample.average_cpu, 99);
        assert_eq!(sample.average_memory, 0);
    }

    #[test]
    fn test_reducer_minimum_one_reading() {
        let mut reducer = SampleReducer::new(0, Duration::from_secs(5));
        let sample = reducer.push(reading(42.0, 17.0), Local::now()).unwrap();
        assert_eq!(sample.average_cpu, 42);
        assert_eq!(sample.window_duration, Duration::from_secs(5));
    }
}
