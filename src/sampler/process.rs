//! Per-process resource statistics
//!
//! Tracks a rolling history of CPU and memory usage for every running
//! process and ranks them by their recent averages.

use super::ProcessRanking;
use crate::domain::{ProcessMetric, ProcessUsage};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

/// Entries kept per process
const MAX_ENTRIES: usize = 60;

/// Usage history of one process
#[derive(Debug, Clone)]
pub struct ProcessStatistics {
    pid: u32,
    name: String,
    entries: VecDeque<(f32, f32)>,
}

impl ProcessStatistics {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            entries: VecDeque::new(),
        }
    }

    /// Record one CPU percent / RAM MB pair
    pub fn push(&mut self, cpu_percent: f32, ram_mb: f32) {
        self.entries.push_back((cpu_percent, ram_mb));
        while self.entries.len() > MAX_ENTRIES {
            self.entries.pop_front();
        }
    }

    /// Average CPU over the most recent `window` entries, one decimal
    pub fn average_cpu(&self, window: usize) -> f32 {
        self.average(window, |(cpu, _)| cpu)
    }

    /// Average RAM over the most recent `window` entries, one decimal
    pub fn average_ram(&self, window: usize) -> f32 {
        self.average(window, |(_, ram)| ram)
    }

    fn average<F>(&self, window: usize, field: F) -> f32
    where
        F: Fn((f32, f32)) -> f32,
    {
        let recent: Vec<f32> = self
            .entries
            .iter()
            .rev()
            .take(window.max(1))
            .map(|e| field(*e))
            .collect();
        if recent.is_empty() {
            return 0.0;
        }
        let avg = recent.iter().sum::<f32>() / recent.len() as f32;
        (avg * 10.0).round() / 10.0
    }

    fn usage(&self, window: usize) -> ProcessUsage {
        ProcessUsage::new(
            self.pid,
            self.name.clone(),
            self.average_cpu(window),
            self.average_ram(window),
        )
    }
}

/// Highest consumer of `metric` among `stats`
pub fn rank_processes<'a, I>(stats: I, metric: ProcessMetric, window: usize) -> Option<ProcessUsage>
where
    I: IntoIterator<Item = &'a ProcessStatistics>,
{
    let key = |s: &ProcessStatistics| match metric {
        ProcessMetric::Cpu => s.average_cpu(window),
        ProcessMetric::Memory => s.average_ram(window),
    };

    stats
        .into_iter()
        .max_by(|a, b| key(a).total_cmp(&key(b)))
        .map(|s| s.usage(window))
}

struct ProcessTable {
    system: System,
    stats: HashMap<u32, ProcessStatistics>,
    cpu_count: usize,
}

/// Process statistics collector
///
/// [`ProcessMonitor::refresh`] is called from the sampler thread while the
/// engine reads rankings, so the table lives behind a mutex.
pub struct ProcessMonitor {
    table: Mutex<ProcessTable>,
}

impl ProcessMonitor {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();
        let cpu_count = system.cpus().len().max(1);

        Self {
            table: Mutex::new(ProcessTable {
                system,
                stats: HashMap::new(),
                cpu_count,
            }),
        }
    }

    /// Take one reading of every running process
    ///
    /// Processes that have exited are dropped.
    pub fn refresh(&self) {
        let mut table = self.lock();
        let ProcessTable {
            system,
            stats,
            cpu_count,
        } = &mut *table;

        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );

        let mut alive = HashSet::new();
        for (pid, process) in system.processes() {
            let pid = pid.as_u32();
            if pid == 0 {
                continue;
            }
            alive.insert(pid);

            // sysinfo reports per-core percent; normalise to the whole machine.
            let cpu = process.cpu_usage() / *cpu_count as f32;
            let ram_mb = process.memory() as f32 / 1024.0 / 1024.0;

            stats
                .entry(pid)
                .or_insert_with(|| {
                    ProcessStatistics::new(pid, process.name().to_string_lossy().into_owned())
                })
                .push((cpu * 10.0).round() / 10.0, ram_mb);
        }

        stats.retain(|pid, _| alive.contains(pid));
    }

    /// Number of tracked processes
    pub fn tracked(&self) -> usize {
        self.lock().stats.len()
    }

    fn lock(&self) -> MutexGuard<'_, ProcessTable> {
        match self.table.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for ProcessMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRanking for ProcessMonitor {
    fn highest_cpu_consumer(&self, window: usize) -> Option<ProcessUsage> {
        rank_processes(self.lock().stats.values(), ProcessMetric::Cpu, window)
    }

    fn highest_ram_consumer(&self, window: usize) -> Option<ProcessUsage> {
        rank_processes(self.lock().stats.values(), ProcessMetric::Memory, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(pid: u32, name: &str, entries: &[(f32, f32)]) -> ProcessStatistics {
        let mut s = ProcessStatistics::new(pid, name);
        for (cpu, ram) in entries {
            s.push(*cpu, *ram);
        }
        s
    }

    #[test]
    fn test_average_uses_recent_entries() {
        let s = stats(1, "a", &[(90.0, 100.0), (10.0, 200.0), (20.0, 300.0)]);
        assert_eq!(s.average_cpu(2), 15.0);
        assert_eq!(s.average_ram(2), 250.0);
        assert_eq!(s.average_cpu(10), 40.0);
    }

    #[test]
    fn test_average_rounds_to_one_decimal() {
        let s = stats(1, "a", &[(1.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        assert_eq!(s.average_cpu(3), 1.3);
    }

    #[test]
    fn test_empty_statistics_average_zero() {
        let s = ProcessStatistics::new(1, "a");
        assert_eq!(s.average_cpu(6), 0.0);
        assert_eq!(s.average_ram(6), 0.0);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut s = ProcessStatistics::new(1, "a");
        for i in 0..(MAX_ENTRIES + 10) {
            s.push(i as f32, 0.0);
        }
        assert_eq!(s.entries.len(), MAX_ENTRIES);
    }

    #[test]
    fn test_rank_by_metric() {
        let all = vec![
            stats(1, "browser", &[(30.0, 2048.0)]),
            stats(2, "compiler", &[(95.0, 512.0)]),
            stats(3, "idle-daemon", &[(0.1, 12.0)]),
        ];

        let cpu = rank_processes(&all, ProcessMetric::Cpu, 6).unwrap();
        assert_eq!(cpu.name, "compiler");
        assert_eq!(cpu.pid, 2);

        let ram = rank_processes(&all, ProcessMetric::Memory, 6).unwrap();
        assert_eq!(ram.name, "browser");
        assert_eq!(ram.ram_mb, 2048.0);
    }

    #[test]
    fn test_rank_empty() {
        let none: Vec<ProcessStatistics> = Vec::new();
        assert!(rank_processes(&none, ProcessMetric::Cpu, 6).is_none());
    }

    #[test]
    fn test_monitor_refresh_tracks_processes() {
        let monitor = ProcessMonitor::new();
        monitor.refresh();
        assert!(monitor.tracked() > 0);
        assert!(monitor.highest_ram_consumer(6).is_some());
    }
}
