//! Service layer for long-running monitoring
//!
//! Services own the sampling loop and the persistent sample history.

pub mod history;
pub mod monitor;

pub use history::SampleHistory;
pub use monitor::{Monitor, MonitorConfig, RunSummary};
