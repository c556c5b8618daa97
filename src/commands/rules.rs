//! Rules command implementation
//!
//! Lists the configured alert definitions.

use super::load_config;
use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, RuleEntry, RuleList};
use crate::error::Result;

/// Execute the rules command
pub fn run_rules(format: OutputFormat, config_path: Option<&str>) -> Result<()> {
    let (config, _) = load_config(config_path)?;

    let list = RuleList {
        rules: config.alerts.iter().map(RuleEntry::from).collect(),
    };
    print_output(&list, format)?;

    Ok(())
}
