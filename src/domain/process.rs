//! Process usage domain types
//!
//! Types describing a single process's averaged resource consumption, used to
//! enrich peak notifications with the top offender.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Averaged resource usage of one process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessUsage {
    /// Process ID
    pub pid: u32,
    /// Process name
    pub name: String,
    /// CPU usage in percent of the whole machine
    pub cpu_percent: f32,
    /// Resident memory in MB
    pub ram_mb: f32,
}

impl ProcessUsage {
    /// Create a new process usage record
    pub fn new(pid: u32, name: impl Into<String>, cpu_percent: f32, ram_mb: f32) -> Self {
        Self {
            pid,
            name: name.into(),
            cpu_percent,
            ram_mb,
        }
    }
}

impl fmt::Display for ProcessUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (PID {}): {:.1}% CPU, {:.0} MB",
            self.name, self.pid, self.cpu_percent, self.ram_mb
        )
    }
}

/// Which resource a ranking or threshold refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessMetric {
    /// CPU usage
    Cpu,
    /// Memory usage
    Memory,
}

impl fmt::Display for ProcessMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "CPU"),
            Self::Memory => write!(f, "RAM"),
        }
    }
}
