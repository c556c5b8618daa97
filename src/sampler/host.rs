//! Whole-host CPU and memory readings via sysinfo

use super::{RawReading, ResourceSampler};
use crate::error::SamplerError;
use sysinfo::System;

/// Reads global CPU usage and used-memory percentage
pub struct HostSampler {
    system: System,
}

impl HostSampler {
    pub fn new() -> Self {
        let mut system = System::new();
        // CPU usage is a delta; the first refresh only sets the baseline.
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self { system }
    }

    /// Machine name for notification titles
    pub fn host_name() -> String {
        System::host_name().unwrap_or_else(|| "localhost".to_string())
    }
}

impl Default for HostSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSampler for HostSampler {
    fn sample(&mut self) -> Result<RawReading, SamplerError> {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let total = self.system.total_memory();
        if total == 0 {
            return Err(SamplerError::MemoryUnavailable);
        }
        let used = self.system.used_memory();

        Ok(RawReading {
            cpu_percent: self.system.global_cpu_usage(),
            memory_percent: (used as f64 / total as f64 * 100.0) as f32,
        })
    }
}
