//! Sampling loop monitor
//!
//! A sampler thread takes raw readings at a fixed interval, reduces them into
//! samples and sends them over a channel. The calling thread owns the alert
//! engine: it feeds each sample in, records history and re-applies the
//! config file when it changes.

use crate::alerts::{AlertEngine, PeakEvent};
use crate::config::{AlertDefinitionConfig, ChannelRegistry, Config, ConfigWatcher};
use crate::domain::Sample;
use crate::error::{AppError, SamplerError};
use crate::sampler::{ProcessMonitor, ResourceSampler, SampleReducer};
use crate::services::SampleHistory;

use chrono::Local;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How often blocked loops check the running flag
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for the monitor
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Interval between raw readings
    pub interval: Duration,
    /// Raw readings averaged into one sample
    pub readings_per_sample: usize,
    /// Stop after this many samples
    pub max_samples: Option<usize>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            readings_per_sample: 6,
            max_samples: None,
        }
    }
}

impl MonitorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: Duration::from_secs(config.general.sample_interval_secs.max(1)),
            readings_per_sample: config.general.samples_per_reading.max(1),
            max_samples: None,
        }
    }
}

/// Outcome of a monitor run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Samples fed to the engine
    pub samples: usize,
    /// Peak start/end events raised
    pub events: usize,
}

/// Sampling loop monitor
pub struct Monitor {
    config: MonitorConfig,
    engine: AlertEngine,
    registry: ChannelRegistry,
    history: Option<SampleHistory>,
    processes: Option<Arc<ProcessMonitor>>,
    watcher: Option<ConfigWatcher>,
}

impl Monitor {
    /// Create a new monitor around an engine and the channels it uses
    pub fn new(config: MonitorConfig, engine: AlertEngine, registry: ChannelRegistry) -> Self {
        Self {
            config,
            engine,
            registry,
            history: None,
            processes: None,
            watcher: None,
        }
    }

    /// Persist every sample to an on-disk history
    pub fn with_history(mut self, history: SampleHistory) -> Self {
        self.history = Some(history);
        self
    }

    /// Refresh per-process statistics on every raw reading
    pub fn with_process_monitor(mut self, processes: Arc<ProcessMonitor>) -> Self {
        self.processes = Some(processes);
        self
    }

    /// Re-apply alert settings when the watched config file changes
    pub fn with_config_watcher(mut self, watcher: ConfigWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Run until `running` is cleared or `max_samples` is reached
    ///
    /// `on_event` sees every peak start and end after it was dispatched.
    pub fn run<S, F>(
        &mut self,
        sampler: S,
        running: Arc<AtomicBool>,
        mut on_event: F,
    ) -> Result<RunSummary, AppError>
    where
        S: ResourceSampler + Send + 'static,
        F: FnMut(&PeakEvent),
    {
        let (tx, rx) = mpsc::channel();
        let handle = spawn_sampler(
            sampler,
            SampleReducer::new(self.config.readings_per_sample, self.config.interval),
            self.config.interval,
            self.processes.clone(),
            Arc::clone(&running),
            tx,
        )?;

        log::info!(
            "Monitoring every {:?}, {} readings per sample",
            self.config.interval,
            self.config.readings_per_sample
        );

        let mut summary = RunSummary::default();
        while running.load(Ordering::SeqCst) {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(sample) => {
                    for event in self.process_sample(sample) {
                        summary.events += 1;
                        on_event(&event);
                    }
                    summary.samples += 1;
                    if self.config.max_samples.is_some_and(|max| summary.samples >= max) {
                        log::info!("Reached {} samples, stopping", summary.samples);
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    log::error!("Sampler stopped unexpectedly");
                    break;
                }
            }
            self.poll_config();
        }

        running.store(false, Ordering::SeqCst);
        drop(rx);
        let outcome = handle
            .join()
            .map_err(|_| AppError::Sampler(SamplerError::ChannelClosed))?;

        log::info!("Monitor stopped after {} samples", summary.samples);
        match outcome {
            Ok(()) | Err(SamplerError::ChannelClosed) => Ok(summary),
            Err(e) => Err(e.into()),
        }
    }

    /// Feed one sample to the engine and record it
    pub fn process_sample(&mut self, sample: Sample) -> Vec<PeakEvent> {
        log::debug!("Sample {}", sample);
        if let Some(history) = self.history.as_mut() {
            if let Err(e) = history.append(sample.clone()) {
                log::warn!("Failed to persist sample history: {}", e);
            }
        }
        self.engine.update(sample)
    }

    /// Check the watched config file and re-apply it if it changed
    pub fn poll_config(&mut self) {
        let Some(watcher) = self.watcher.as_mut() else {
            return;
        };
        match watcher.poll() {
            None => {}
            Some(Ok(config)) => {
                log::info!("Config file {} changed, reloading", watcher.path().display());
                if let Err(e) = self.apply_config(&config) {
                    log::warn!("Config reload failed: {}", e);
                }
            }
            Some(Err(e)) => log::warn!("Ignoring unreadable config change: {}", e),
        }
    }

    /// Re-apply channels and alert definitions from a reloaded config
    ///
    /// Known definitions are updated in place, new ones are added and ones
    /// no longer listed are made inert. Open reports are kept. An alert that
    /// fails to resolve is skipped with a warning.
    pub fn apply_config(&mut self, config: &Config) -> Result<(), AppError> {
        for problem in config.problems() {
            log::warn!("{}", problem);
        }
        self.registry.reconcile(&config.channels)?;

        let mut listed = HashSet::new();
        for alert in &config.alerts {
            listed.insert(alert.id.clone());
            if let Err(e) = self.apply_alert(alert) {
                log::warn!("Skipping alert '{}': {}", alert.id, e);
            }
        }

        if self.processes.is_none() {
            for id in top_process_alerts(config) {
                log::warn!(
                    "Alert '{}' wants the top process, but process tracking was off at startup; restart to enable it",
                    id
                );
            }
        }

        let removed: Vec<String> = self
            .engine
            .definitions()
            .iter()
            .filter(|d| !listed.contains(&d.id) && d.measurement_window > 0)
            .map(|d| d.id.clone())
            .collect();
        for id in removed {
            log::info!("Alert '{}' removed from config, disabling", id);
            self.engine.update_definition(
                &id,
                crate::alerts::DefinitionUpdate {
                    measurement_window: Some(0),
                    ..Default::default()
                },
            )?;
        }

        Ok(())
    }

    fn apply_alert(&mut self, alert: &AlertDefinitionConfig) -> Result<(), AppError> {
        if self.engine.definition(&alert.id).is_some() {
            let update = alert.to_update(&self.registry)?;
            self.engine.update_definition(&alert.id, update)?;
        } else {
            self.engine.add_definition(alert.to_definition(&self.registry)?)?;
        }
        Ok(())
    }

    pub fn engine(&self) -> &AlertEngine {
        &self.engine
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }
}

/// Enabled alerts that want a top-process line
fn top_process_alerts(config: &Config) -> impl Iterator<Item = &str> {
    config
        .alerts
        .iter()
        .filter(|a| a.enabled && a.include_top_process)
        .map(|a| a.id.as_str())
}

fn spawn_sampler<S>(
    mut sampler: S,
    mut reducer: SampleReducer,
    interval: Duration,
    processes: Option<Arc<ProcessMonitor>>,
    running: Arc<AtomicBool>,
    tx: mpsc::Sender<Sample>,
) -> Result<thread::JoinHandle<Result<(), SamplerError>>, AppError>
where
    S: ResourceSampler + Send + 'static,
{
    let handle = thread::Builder::new()
        .name("perfwatch-sampler".to_string())
        .spawn(move || {
            while running.load(Ordering::SeqCst) {
                sleep_while_running(interval, &running);
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                if let Some(processes) = &processes {
                    processes.refresh();
                }

                let reading = match sampler.sample() {
                    Ok(reading) => reading,
                    Err(e) => {
                        log::error!("Reading failed: {}", e);
                        continue;
                    }
                };

                if let Some(sample) = reducer.push(reading, Local::now()) {
                    tx.send(sample).map_err(|_| SamplerError::ChannelClosed)?;
                }
            }
            Ok(())
        })?;
    Ok(handle)
}

fn sleep_while_running(total: Duration, running: &AtomicBool) {
    let mut remaining = total;
    while !remaining.is_zero() && running.load(Ordering::SeqCst) {
        let step = remaining.min(POLL_INTERVAL);
        thread::sleep(step);
        remaining -= step;
    }
}
