//! perfwatch - host CPU/RAM watcher library
//!
//! This library samples whole-host CPU and memory usage, averages it over
//! sliding windows and raises start/end notifications for sustained peaks.
//!
//! # Modules
//!
//! - [`alerts`]: Alert engine, peak reports and notification channels
//! - [`cli`]: Command-line interface definitions
//! - [`commands`]: Command handlers
//! - [`config`]: Configuration system
//! - [`domain`]: Sample and process value types
//! - [`error`]: Error types
//! - [`sampler`]: Host and per-process sampling
//! - [`services`]: Sampling loop and sample history

pub mod alerts;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod sampler;
pub mod services;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{AppError, Result};
