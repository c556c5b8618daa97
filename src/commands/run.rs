//! Run command implementation
//!
//! Starts the sampler and alert engine and keeps them running until Ctrl+C
//! or until the requested number of samples has been processed.

use crate::alerts::{AlertEngine, EngineConfig};
use crate::cli::args::{OutputFormat, RunArgs};
use crate::cli::output::{print_output, EventOutput, Message};
use crate::config::{ChannelRegistry, Config, ConfigBuilder, ConfigWatcher};
use crate::error::{AppError, Result};
use crate::sampler::{HostSampler, ProcessMonitor};
use crate::services::{Monitor, MonitorConfig, SampleHistory};

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Execute the run command
pub fn run_monitor(
    args: &RunArgs,
    format: OutputFormat,
    config_path: Option<&str>,
    verbose: bool,
) -> Result<()> {
    let (config, source) = ConfigBuilder::new()
        .with_file(config_path)?
        .with_verbose(verbose.then_some(true))
        .with_interval(args.interval)
        .with_samples_per_reading(args.samples.map(|s| s as usize))
        .with_history_file(args.history.clone())
        .build_with_source();

    for problem in config.problems() {
        log::warn!("{}", problem);
    }

    let mut monitor = build_monitor(&config, source, args.once)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| AppError::Signal(e.to_string()))?;

    if config.general.verbose {
        log::info!("Starting monitor");
        log::info!("  Interval: {:?}", monitor.config().interval);
        log::info!("  Readings per sample: {}", config.general.samples_per_reading);
        log::info!("  Alerts: {}", monitor.engine().definitions().len());
    }

    let summary = monitor.run(HostSampler::new(), running, |event| {
        if let Err(e) = print_output(&EventOutput::from(event), format) {
            log::warn!("Failed to print event: {}", e);
        }
    })?;

    let msg = Message {
        message: format!(
            "Processed {} samples, {} peak events",
            summary.samples, summary.events
        ),
        success: true,
    };
    print_output(&msg, format)?;

    Ok(())
}

/// Wire the engine, channels and services described by `config`
///
/// Alerts that reference an unknown channel are skipped with a warning so a
/// later config reload can still add them.
fn build_monitor(
    config: &Config,
    source: Option<PathBuf>,
    max_samples: Option<usize>,
) -> Result<Monitor> {
    let registry = ChannelRegistry::from_config(&config.channels)?;

    let mut definitions = Vec::with_capacity(config.alerts.len());
    for alert in &config.alerts {
        match alert.to_definition(&registry) {
            Ok(definition) => definitions.push(definition),
            Err(e) => log::warn!("Skipping alert '{}': {}", alert.id, e),
        }
    }

    let engine_config = EngineConfig {
        host_name: HostSampler::host_name(),
        log_retention: config.general.log_retention,
    };
    let mut engine = AlertEngine::new(engine_config, definitions)?;

    let processes = if config.wants_process_ranking() {
        let processes = Arc::new(ProcessMonitor::new());
        engine = engine.with_process_ranking(processes.clone());
        Some(processes)
    } else {
        None
    };

    let monitor_config = MonitorConfig {
        max_samples,
        ..MonitorConfig::from_config(config)
    };
    let mut monitor = Monitor::new(monitor_config, engine, registry);

    if let Some(path) = &config.general.history_file {
        monitor = monitor.with_history(SampleHistory::open(path, config.general.history_limit));
    }
    if let Some(processes) = processes {
        monitor = monitor.with_process_monitor(processes);
    }
    if config.general.reload_config {
        if let Some(path) = source {
            log::debug!("Watching {} for changes", path.display());
            monitor = monitor.with_config_watcher(ConfigWatcher::new(path));
        }
    }

    Ok(monitor)
}
