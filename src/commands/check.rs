//! Check command implementation
//!
//! Validates every setting and asks each channel to accept its key.

use super::load_config;
use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, ChannelCheck, CheckReport};
use crate::config::{ChannelRegistry, Config};
use crate::error::{AppError, Result};

use std::path::PathBuf;

/// Execute the check command
pub fn run_check(format: OutputFormat, config_path: Option<&str>) -> Result<()> {
    let (config, source) = load_config(config_path)?;
    let report = check_config(&config, source)?;
    print_output(&report, format)?;

    if report.is_ok() {
        Ok(())
    } else {
        let rejected = report
            .channels
            .iter()
            .filter(|c| c.key_accepted == Some(false))
            .count();
        Err(AppError::CheckFailed(report.problems.len() + rejected))
    }
}

fn check_config(config: &Config, source: Option<PathBuf>) -> Result<CheckReport> {
    let problems = config.problems().iter().map(ToString::to_string).collect();
    let registry = ChannelRegistry::from_config(&config.channels)?;

    let mut channels = Vec::with_capacity(config.channels.len());
    for channel in &config.channels {
        let Some(provider) = registry.get(&channel.name) else {
            continue;
        };
        let key_accepted = channel
            .key
            .as_deref()
            .map(|key| provider.set_channel_key(key));
        channels.push(ChannelCheck {
            name: channel.name.clone(),
            kind: channel.kind.to_string(),
            key_accepted,
            devices: provider.list_devices().map(|d| d.len()),
        });
    }

    Ok(CheckReport {
        source: source.map(|p| p.display().to_string()),
        problems,
        channels,
    })
}
