//! Devices command implementation
//!
//! Lists the devices a configured channel can deliver to.

use super::load_config;
use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, DeviceEntry, DeviceList};
use crate::config::ChannelRegistry;
use crate::error::{AppError, NotifyError, Result};

/// Execute the devices command
pub fn run_devices(channel: &str, format: OutputFormat, config_path: Option<&str>) -> Result<()> {
    let (config, _) = load_config(config_path)?;
    let registry = ChannelRegistry::from_config(&config.channels)?;

    let provider = registry
        .get(channel)
        .ok_or_else(|| AppError::ChannelNotFound(channel.to_string()))?;

    // None means the channel has no valid key or could not reach its service.
    let devices = provider.list_devices().ok_or(NotifyError::MissingKey)?;

    let list = DeviceList {
        channel: channel.to_string(),
        devices: devices.iter().map(DeviceEntry::from).collect(),
    };
    print_output(&list, format)?;

    Ok(())
}
