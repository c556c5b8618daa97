//! Alert engine implementation
//!
//! Consumes one [`Sample`] at a time, evaluates every alert definition
//! against the trailing window averages, opens and closes peak reports and
//! dispatches notifications.
//!
//! A definition opens a report when the average over its full measurement
//! window strictly exceeds a threshold, and closes it only once the same
//! full-window average has fallen back. The end notification summarises the
//! last [`END_SUMMARY_WINDOW`] samples instead, so it reflects current load.

use super::notifier::DeliveryReport;
use super::reading_log::ReadingLog;
use super::types::{
    AlertDefinition, DefinitionUpdate, Notification, PeakEvent, PeakEventKind, PeakReport,
};
use crate::domain::{ProcessMetric, Sample};
use crate::error::EngineError;
use crate::sampler::ProcessRanking;
use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;

/// Samples averaged in the "back to normal" summary
pub const END_SUMMARY_WINDOW: usize = 3;

/// Per-process entries averaged when naming the top consumer
pub const TOP_PROCESS_WINDOW: usize = 6;

/// Alert engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Machine name used in notification titles
    pub host_name: String,
    /// Cap on stored samples; never applied below the largest window
    pub log_retention: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host_name: "localhost".to_string(),
            log_retention: None,
        }
    }
}

/// Trailing averages over one definition's full window
#[derive(Debug, Clone, Copy)]
struct WindowAverages {
    cpu: u32,
    ram: u32,
}

/// Alert engine
///
/// Owns the reading log and the peak report history. At most one report per
/// definition is open at any time.
pub struct AlertEngine {
    definitions: Vec<AlertDefinition>,
    log: ReadingLog,
    reports: Vec<PeakReport>,
    ranking: Option<Arc<dyn ProcessRanking>>,
    host_name: String,
    requested_retention: Option<usize>,
}

impl AlertEngine {
    /// Create an engine for the given definitions
    pub fn new(config: EngineConfig, definitions: Vec<AlertDefinition>) -> Result<Self, EngineError> {
        let mut engine = Self {
            definitions: Vec::with_capacity(definitions.len()),
            log: ReadingLog::new(),
            reports: Vec::new(),
            ranking: None,
            host_name: config.host_name,
            requested_retention: config.log_retention,
        };

        for definition in definitions {
            engine.add_definition(definition)?;
        }
        engine.apply_retention();

        Ok(engine)
    }

    /// Attach the process-ranking collaborator used for top-process lines
    pub fn with_process_ranking(mut self, ranking: Arc<dyn ProcessRanking>) -> Self {
        self.ranking = Some(ranking);
        self
    }

    /// Register another definition
    pub fn add_definition(&mut self, definition: AlertDefinition) -> Result<(), EngineError> {
        if self.definition(&definition.id).is_some() {
            return Err(EngineError::DuplicateDefinition(definition.id));
        }
        self.definitions.push(definition);
        self.apply_retention();
        Ok(())
    }

    /// Re-apply configuration to an existing definition
    ///
    /// Takes effect from the next [`AlertEngine::update`]. Open reports are
    /// kept and will close against the new thresholds.
    pub fn update_definition(
        &mut self,
        id: &str,
        update: DefinitionUpdate,
    ) -> Result<(), EngineError> {
        let definition = self
            .definitions
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| EngineError::UnknownDefinition(id.to_string()))?;

        definition.apply(update);
        log::debug!("Updated alert definition {:?}", definition);
        self.apply_retention();
        Ok(())
    }

    /// Feed one new sample and evaluate every definition
    ///
    /// Never fails: a definition that cannot be evaluated is skipped and
    /// delivery failures are only logged. A sample that is not newer than the
    /// last one accepted is treated as a replay and ignored.
    pub fn update(&mut self, sample: Sample) -> Vec<PeakEvent> {
        if let Some(last) = self.log.last() {
            if sample.timestamp <= last.timestamp {
                log::warn!(
                    "Ignoring sample at {}: not newer than the last accepted one at {} (clock stepped back?)",
                    sample.timestamp,
                    last.timestamp
                );
                return Vec::new();
            }
        }

        let now = sample.timestamp;
        self.log.append(sample);

        let mut events = Vec::new();
        for idx in 0..self.definitions.len() {
            // Snapshot so thresholds and window cannot tear mid-evaluation.
            let definition = self.definitions[idx].clone();

            if let Some(event) = self.evaluate_peak_start(&definition, now) {
                events.push(event);
            }
            if let Some(event) = self.evaluate_peak_end(&definition, now) {
                events.push(event);
            }
        }

        events
    }

    /// Get all definitions
    pub fn definitions(&self) -> &[AlertDefinition] {
        &self.definitions
    }

    /// Look up a definition by id
    pub fn definition(&self, id: &str) -> Option<&AlertDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    /// Full report history, oldest first
    pub fn reports(&self) -> &[PeakReport] {
        &self.reports
    }

    /// Report history of one definition
    pub fn reports_for<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a PeakReport> + 'a {
        self.reports.iter().filter(move |r| r.definition_id == id)
    }

    /// The currently open report of a definition
    pub fn open_report(&self, id: &str) -> Option<&PeakReport> {
        self.open_report_index(id).map(|idx| &self.reports[idx])
    }

    /// The reading log seen by the engine
    pub fn reading_log(&self) -> &ReadingLog {
        &self.log
    }

    fn evaluate_peak_start(
        &mut self,
        definition: &AlertDefinition,
        now: DateTime<Local>,
    ) -> Option<PeakEvent> {
        let averages = self.window_averages(definition)?;
        if !Self::peak_reached(definition, averages) {
            return None;
        }

        if self.open_report_index(&definition.id).is_some() {
            return None;
        }

        let notification = self.peak_start_notification(definition, averages, now);
        let mut report = PeakReport::new(&definition.id);
        report.open(notification.clone(), now);
        self.reports.push(report);

        log::info!(
            "Peak started for '{}' (CPU {}% / {}%, RAM {} / {})",
            definition.id,
            averages.cpu,
            definition.cpu_threshold,
            averages.ram,
            definition.memory_threshold
        );
        Self::dispatch(definition, &notification);

        Some(PeakEvent {
            definition_id: definition.id.clone(),
            kind: PeakEventKind::Started,
            notification,
            at: now,
        })
    }

    fn evaluate_peak_end(
        &mut self,
        definition: &AlertDefinition,
        now: DateTime<Local>,
    ) -> Option<PeakEvent> {
        let averages = self.window_averages(definition)?;
        if Self::peak_reached(definition, averages) {
            return None;
        }

        let idx = self.open_report_index(&definition.id)?;
        let opened_at = self.reports[idx].opened_at()?;

        let notification = self.peak_end_notification(opened_at, now);
        if !self.reports[idx].close(notification.clone(), now) {
            return None;
        }

        log::info!(
            "Peak ended for '{}' after {}",
            definition.id,
            format_elapsed(opened_at, now)
        );
        Self::dispatch(definition, &notification);

        Some(PeakEvent {
            definition_id: definition.id.clone(),
            kind: PeakEventKind::Ended,
            notification,
            at: now,
        })
    }

    /// Full-window averages, or `None` when the definition must be skipped
    fn window_averages(&self, definition: &AlertDefinition) -> Option<WindowAverages> {
        if !definition.is_active() {
            log::debug!("Skipping inert alert definition '{}'", definition.id);
            return None;
        }

        let interval = definition.measurement_window;
        if self.log.count() < interval {
            log::debug!(
                "Skipping '{}': {} of {} samples collected",
                definition.id,
                self.log.count(),
                interval
            );
            return None;
        }

        Some(WindowAverages {
            cpu: self.log.trailing_average_cpu(interval)?,
            ram: self.log.trailing_average_ram(interval)?,
        })
    }

    fn peak_reached(definition: &AlertDefinition, averages: WindowAverages) -> bool {
        averages.cpu > definition.cpu_threshold || averages.ram > definition.memory_threshold
    }

    fn open_report_index(&self, id: &str) -> Option<usize> {
        self.reports
            .iter()
            .position(|r| r.definition_id == id && r.is_open())
    }

    fn title(&self) -> String {
        format!("Performance Monitor Alert from {}", self.host_name)
    }

    fn peak_start_notification(
        &self,
        definition: &AlertDefinition,
        averages: WindowAverages,
        now: DateTime<Local>,
    ) -> Notification {
        let interval = definition.measurement_window;
        let covered: Duration = self
            .log
            .iter()
            .rev()
            .take(interval)
            .map(|s| s.window_duration)
            .sum();

        let mut body = format!(
            "{}\nAverage peak over the last {} samples ({}):\nCPU: {}%\nRAM: {}%",
            now.format("%Y-%m-%d %H:%M:%S"),
            interval,
            format_duration(covered),
            averages.cpu,
            averages.ram
        );

        if definition.include_top_process {
            if averages.cpu > definition.cpu_threshold {
                self.append_top_process(&mut body, ProcessMetric::Cpu);
            }
            if averages.ram > definition.memory_threshold {
                self.append_top_process(&mut body, ProcessMetric::Memory);
            }
        }

        Notification::new(self.title(), body)
    }

    fn append_top_process(&self, body: &mut String, metric: ProcessMetric) {
        let Some(ranking) = &self.ranking else {
            return;
        };

        let top = match metric {
            ProcessMetric::Cpu => ranking.highest_cpu_consumer(TOP_PROCESS_WINDOW),
            ProcessMetric::Memory => ranking.highest_ram_consumer(TOP_PROCESS_WINDOW),
        };

        if let Some(usage) = top {
            body.push_str(&format!("\nTop {} process: {}", metric, usage));
        }
    }

    fn peak_end_notification(&self, opened_at: DateTime<Local>, now: DateTime<Local>) -> Notification {
        // The divisor is fixed even when fewer samples exist.
        let cpu = self.log.trailing_average_cpu(END_SUMMARY_WINDOW).unwrap_or(0);
        let ram = self.log.trailing_average_ram(END_SUMMARY_WINDOW).unwrap_or(0);

        let body = format!(
            "{}\nEverything back to normal after {}. Average of the last {} samples:\nCPU: {}%\nRAM: {}%",
            now.format("%Y-%m-%d %H:%M:%S"),
            format_elapsed(opened_at, now),
            END_SUMMARY_WINDOW,
            cpu,
            ram
        );

        Notification::new(self.title(), body)
    }

    fn dispatch(definition: &AlertDefinition, notification: &Notification) {
        let report: DeliveryReport = definition
            .channel
            .notify(notification, &definition.device_ids);

        for (device, err) in &report.failed {
            log::warn!(
                "Failed to notify device '{}' via {} for '{}': {}",
                device,
                definition.channel.name(),
                definition.id,
                err
            );
        }

        if !report.delivered.is_empty() {
            log::debug!(
                "Notified {} device(s) via {} for '{}'",
                report.delivered.len(),
                definition.channel.name(),
                definition.id
            );
        }
    }

    fn apply_retention(&mut self) {
        let largest_window = self
            .definitions
            .iter()
            .map(|d| d.measurement_window)
            .max()
            .unwrap_or(0);
        let required = largest_window.max(END_SUMMARY_WINDOW);

        self.log
            .set_retention(self.requested_retention.map(|cap| cap.max(required)));
    }
}

/// Whole minutes between two instants, rounded to nearest
fn format_elapsed(from: DateTime<Local>, to: DateTime<Local>) -> String {
    let secs = (to - from).num_seconds().max(0);
    format!("{} min", (secs + 30) / 60)
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{} min", (secs + 30) / 60)
    } else {
        format!("{} s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::types::ReportState;
    use crate::domain::ProcessUsage;
    use crate::mock::{FixedRanking, RecordingNotifier};
    use chrono::TimeZone;

    struct Feed {
        start: DateTime<Local>,
        tick: i64,
    }

    impl Feed {
        fn new() -> Self {
            Self {
                start: Local.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
                tick: 0,
            }
        }

        fn next(&mut self, cpu: u32, ram: u32) -> Sample {
            self.tick += 1;
            Sample::at(
                cpu,
                ram,
                self.start + chrono::Duration::minutes(self.tick),
                Duration::from_secs(60),
            )
        }
    }

    fn engine_with(definitions: Vec<AlertDefinition>) -> AlertEngine {
        let config = EngineConfig {
            host_name: "testhost".to_string(),
            log_retention: None,
        };
        AlertEngine::new(config, definitions).unwrap()
    }

    fn cpu_definition(channel: &Arc<RecordingNotifier>, threshold: u32, window: usize) -> AlertDefinition {
        AlertDefinition::new("cpu", channel.clone(), window, threshold, 100).with_devices(["phone"])
    }

    #[test]
    fn test_engine_creation() {
        let channel = Arc::new(RecordingNotifier::new());
        let engine = engine_with(vec![
            cpu_definition(&channel, 30, 3),
            AlertDefinition::new("ram", channel.clone(), 3, 100, 80).with_devices(["phone"]),
        ]);

        assert_eq!(engine.definitions().len(), 2);
        assert!(engine.reports().is_empty());
        assert!(engine.reading_log().is_empty());
    }

    #[test]
    fn test_duplicate_definition_rejected() {
        let channel = Arc::new(RecordingNotifier::new());
        let result = AlertEngine::new(
            EngineConfig::default(),
            vec![cpu_definition(&channel, 30, 3), cpu_definition(&channel, 40, 3)],
        );
        assert!(matches!(result, Err(EngineError::DuplicateDefinition(_))));
    }

    #[test]
    fn test_no_start_before_window_filled() {
        let channel = Arc::new(RecordingNotifier::new());
        let mut engine = engine_with(vec![cpu_definition(&channel, 30, 3)]);
        let mut feed = Feed::new();

        assert!(engine.update(feed.next(90, 0)).is_empty());
        assert!(engine.update(feed.next(90, 0)).is_empty());
        assert_eq!(channel.sent().len(), 0);

        let events = engine.update(feed.next(90, 0));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, PeakEventKind::Started);
        assert_eq!(channel.sent().len(), 1);
    }

    #[test]
    fn test_equal_to_threshold_is_not_a_peak() {
        let channel = Arc::new(RecordingNotifier::new());
        let mut engine = engine_with(vec![cpu_definition(&channel, 30, 3)]);
        let mut feed = Feed::new();

        for _ in 0..5 {
            assert!(engine.update(feed.next(30, 0)).is_empty());
        }
        assert!(engine.reports().is_empty());
    }

    #[test]
    fn test_memory_threshold_opens_report() {
        let channel = Arc::new(RecordingNotifier::new());
        let def = AlertDefinition::new("ram", channel.clone(), 2, 100, 80).with_devices(["phone"]);
        let mut engine = engine_with(vec![def]);
        let mut feed = Feed::new();

        engine.update(feed.next(0, 85));
        let events = engine.update(feed.next(0, 85));

        assert_eq!(events.len(), 1);
        assert!(events[0].notification.body.contains("RAM: 85%"));
        assert!(engine.open_report("ram").is_some());
    }

    #[test]
    fn test_start_notification_body() {
        let channel = Arc::new(RecordingNotifier::new());
        let mut engine = engine_with(vec![cpu_definition(&channel, 30, 3)]);
        let mut feed = Feed::new();

        for _ in 0..3 {
            engine.update(feed.next(40, 55));
        }

        let sent = channel.sent();
        assert_eq!(sent.len(), 1);
        let (note, devices) = &sent[0];
        assert_eq!(note.title, "Performance Monitor Alert from testhost");
        assert!(note.body.contains("over the last 3 samples (3 min)"));
        assert!(note.body.contains("CPU: 40%"));
        assert!(note.body.contains("RAM: 55%"));
        assert!(devices.contains("phone"));
    }

    #[test]
    fn test_sustained_peak_reported_once() {
        let channel = Arc::new(RecordingNotifier::new());
        let mut engine = engine_with(vec![cpu_definition(&channel, 30, 2)]);
        let mut feed = Feed::new();

        for _ in 0..10 {
            engine.update(feed.next(95, 0));
        }

        assert_eq!(channel.sent().len(), 1);
        assert_eq!(engine.reports().len(), 1);
        assert!(engine.reports()[0].is_open());
    }

    #[test]
    fn test_end_uses_full_window_for_trigger() {
        let channel = Arc::new(RecordingNotifier::new());
        let mut engine = engine_with(vec![cpu_definition(&channel, 30, 3)]);
        let mut feed = Feed::new();

        for _ in 0..3 {
            engine.update(feed.next(60, 0));
        }
        assert!(engine.open_report("cpu").is_some());

        // Window [60, 60, 0] = 40, still above 30.
        assert!(engine.update(feed.next(0, 0)).is_empty());
        // Window [60, 0, 0] = 20, back to normal.
        let events = engine.update(feed.next(0, 0));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, PeakEventKind::Ended);
        assert!(engine.open_report("cpu").is_none());
    }

    #[test]
    fn test_end_body_uses_fixed_three_sample_window() {
        let channel = Arc::new(RecordingNotifier::new());
        let mut engine = engine_with(vec![cpu_definition(&channel, 30, 5)]);
        let mut feed = Feed::new();

        for _ in 0..5 {
            engine.update(feed.next(50, 10));
        }
        // Full 5-window: 42, 34, then 28 ends the peak; last three are 10, 10, 20.
        for cpu in [10, 10, 20, 20] {
            engine.update(feed.next(cpu, 10));
        }

        let sent = channel.sent();
        assert_eq!(sent.len(), 2);
        let end = &sent[1].0;
        assert!(end.body.contains("Everything back to normal after 3 min"));
        assert!(end.body.contains("Average of the last 3 samples"));
        assert!(end.body.contains("CPU: 13%"));
        assert!(end.body.contains("RAM: 10%"));
    }

    #[test]
    fn test_reopen_after_close_creates_new_report() {
        let channel = Arc::new(RecordingNotifier::new());
        let mut engine = engine_with(vec![cpu_definition(&channel, 30, 1)]);
        let mut feed = Feed::new();

        engine.update(feed.next(50, 0));
        engine.update(feed.next(10, 0));
        engine.update(feed.next(50, 0));

        let reports: Vec<_> = engine.reports_for("cpu").collect();
        assert_eq!(reports.len(), 2);
        assert!(reports[0].is_closed());
        assert!(reports[1].is_open());
        assert_eq!(channel.sent().len(), 3);
    }

    #[test]
    fn test_replayed_sample_ignored() {
        let channel = Arc::new(RecordingNotifier::new());
        let mut engine = engine_with(vec![cpu_definition(&channel, 30, 1)]);
        let mut feed = Feed::new();

        let sample = feed.next(80, 0);
        assert_eq!(engine.update(sample.clone()).len(), 1);
        assert!(engine.update(sample).is_empty());

        assert_eq!(engine.reading_log().count(), 1);
        assert_eq!(engine.reports().len(), 1);
        assert_eq!(channel.sent().len(), 1);
    }

    #[test]
    fn test_clock_step_back_skips_until_caught_up() {
        let channel = Arc::new(RecordingNotifier::new());
        let mut engine = engine_with(vec![cpu_definition(&channel, 30, 1)]);
        let mut feed = Feed::new();

        let first = feed.next(10, 0);
        let last = first.timestamp;
        engine.update(first);

        let behind = Sample::at(90, 0, last - chrono::Duration::minutes(5), Duration::from_secs(60));
        assert!(engine.update(behind).is_empty());
        let same = Sample::at(90, 0, last, Duration::from_secs(60));
        assert!(engine.update(same).is_empty());
        assert_eq!(engine.reading_log().count(), 1);

        let caught_up = Sample::at(90, 0, last + chrono::Duration::seconds(1), Duration::from_secs(60));
        assert_eq!(engine.update(caught_up).len(), 1);
        assert_eq!(engine.reading_log().count(), 2);
    }

    #[test]
    fn test_inert_definitions_never_trigger() {
        let channel = Arc::new(RecordingNotifier::new());
        let zero_window = AlertDefinition::new("zero", channel.clone(), 0, 0, 0).with_devices(["phone"]);
        let no_devices = AlertDefinition::new("nodev", channel.clone(), 1, 0, 0);
        let mut engine = engine_with(vec![zero_window, no_devices]);
        let mut feed = Feed::new();

        for _ in 0..5 {
            assert!(engine.update(feed.next(100, 100)).is_empty());
        }
        assert!(engine.reports().is_empty());
        assert!(channel.sent().is_empty());
    }

    #[test]
    fn test_update_definition_takes_effect_next_tick() {
        let channel = Arc::new(RecordingNotifier::new());
        let mut engine = engine_with(vec![cpu_definition(&channel, 50, 2)]);
        let mut feed = Feed::new();

        engine.update(feed.next(40, 0));
        assert!(engine.update(feed.next(40, 0)).is_empty());

        engine
            .update_definition(
                "cpu",
                DefinitionUpdate {
                    cpu_threshold: Some(30),
                    ..Default::default()
                },
            )
            .unwrap();

        let events = engine.update(feed.next(40, 0));
        assert_eq!(events.len(), 1);
        assert_eq!(engine.definition("cpu").unwrap().cpu_threshold, 30);
    }

    #[test]
    fn test_update_unknown_definition() {
        let mut engine = engine_with(Vec::new());
        let result = engine.update_definition("missing", DefinitionUpdate::default());
        assert_eq!(
            result,
            Err(EngineError::UnknownDefinition("missing".to_string()))
        );
    }

    #[test]
    fn test_retention_never_below_largest_window() {
        let channel = Arc::new(RecordingNotifier::new());
        let config = EngineConfig {
            host_name: "h".to_string(),
            log_retention: Some(2),
        };
        let mut engine = AlertEngine::new(config, vec![cpu_definition(&channel, 30, 5)]).unwrap();
        assert_eq!(engine.reading_log().retention(), Some(5));

        engine
            .update_definition(
                "cpu",
                DefinitionUpdate {
                    measurement_window: Some(8),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(engine.reading_log().retention(), Some(8));

        let mut feed = Feed::new();
        for _ in 0..8 {
            engine.update(feed.next(90, 0));
        }
        assert!(engine.open_report("cpu").is_some());
    }

    #[test]
    fn test_top_process_included_for_crossed_metric() {
        let channel = Arc::new(RecordingNotifier::new());
        let ranking = Arc::new(FixedRanking::new(
            Some(ProcessUsage::new(10, "compiler", 87.5, 300.0)),
            Some(ProcessUsage::new(20, "database", 2.0, 4096.0)),
        ));
        let def = cpu_definition(&channel, 30, 1).with_top_process();
        let mut engine = engine_with(vec![def]).with_process_ranking(ranking);
        let mut feed = Feed::new();

        engine.update(feed.next(90, 10));

        let body = &channel.sent()[0].0.body;
        assert!(body.contains("Top CPU process: compiler (PID 10)"));
        assert!(!body.contains("database"));
    }

    #[test]
    fn test_top_process_omitted_when_disabled() {
        let channel = Arc::new(RecordingNotifier::new());
        let ranking = Arc::new(FixedRanking::new(
            Some(ProcessUsage::new(10, "compiler", 87.5, 300.0)),
            None,
        ));
        let mut engine = engine_with(vec![cpu_definition(&channel, 30, 1)]).with_process_ranking(ranking);
        let mut feed = Feed::new();

        engine.update(feed.next(90, 10));
        assert!(!channel.sent()[0].0.body.contains("Top"));
    }

    #[test]
    fn test_delivery_failure_does_not_abort_update() {
        let channel = Arc::new(RecordingNotifier::failing());
        let mut engine = engine_with(vec![cpu_definition(&channel, 30, 1)]);
        let mut feed = Feed::new();

        let events = engine.update(feed.next(90, 0));
        assert_eq!(events.len(), 1);
        assert!(matches!(engine.reports()[0].state, ReportState::Open { .. }));
    }
}
