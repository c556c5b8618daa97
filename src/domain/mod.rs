//! Domain models for perfwatch
//!
//! Plain value types shared by the sampler, the alert engine and the CLI.

pub mod process;
pub mod sample;

pub use process::{ProcessMetric, ProcessUsage};
pub use sample::Sample;
