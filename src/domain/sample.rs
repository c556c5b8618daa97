//! Reduced resource readings
//!
//! A [`Sample`] is one already-averaged CPU/RAM reading as produced by the
//! host sampler at a fixed cadence.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One reduced reading of host resource usage
///
/// Immutable once created. The memory unit is fixed by the sampler
/// (percent for the built-in host sampler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Average CPU usage over the measurement window, in percent
    pub average_cpu: u32,
    /// Average memory usage over the measurement window
    pub average_memory: u32,
    /// When the reading was completed
    pub timestamp: DateTime<Local>,
    /// How long the sampler measured to produce this reading
    pub window_duration: Duration,
}

impl Sample {
    /// Create a sample stamped with the current local time
    pub fn new(average_cpu: u32, average_memory: u32, window_duration: Duration) -> Self {
        Self::at(average_cpu, average_memory, Local::now(), window_duration)
    }

    /// Create a sample with an explicit timestamp
    pub fn at(
        average_cpu: u32,
        average_memory: u32,
        timestamp: DateTime<Local>,
        window_duration: Duration,
    ) -> Self {
        Self {
            average_cpu,
            average_memory,
            timestamp,
            window_duration,
        }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} CPU {}% RAM {}% ({}s)",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.average_cpu,
            self.average_memory,
            self.window_duration.as_secs()
        )
    }
}
