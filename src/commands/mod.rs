//! Command handlers
//!
//! Each command handler orchestrates the execution of a CLI command.

pub mod check;
pub mod devices;
pub mod history;
pub mod rules;
pub mod run;

pub use check::run_check;
pub use devices::run_devices;
pub use history::run_log;
pub use rules::run_rules;
pub use run::run_monitor;

use crate::config::{Config, ConfigBuilder};
use crate::error::Result;
use std::path::PathBuf;

/// Load configuration from an explicit path or the default locations
pub(crate) fn load_config(path: Option<&str>) -> Result<(Config, Option<PathBuf>)> {
    Ok(ConfigBuilder::new().with_file(path)?.build_with_source())
}
