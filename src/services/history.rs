//! On-disk sample history
//!
//! Keeps the most recent samples as a JSON array so `perfwatch log` can show
//! them after the fact. A file that cannot be read back is moved aside and
//! replaced with an empty history.

use crate::domain::Sample;
use crate::error::AppError;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Suffix of quarantined history files
const BROKEN_SUFFIX: &str = "broken-history.json";

/// Persistent, size-capped sample history
#[derive(Debug)]
pub struct SampleHistory {
    path: PathBuf,
    limit: usize,
    entries: VecDeque<Sample>,
}

impl SampleHistory {
    /// Open the history at `path`, quarantining it if it is unreadable
    pub fn open(path: impl Into<PathBuf>, limit: usize) -> Self {
        let path = path.into();
        let entries = match Self::read(&path) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Sample history {} unreadable: {}", path.display(), e);
                match quarantine(&path) {
                    Ok(moved) => log::warn!("Moved broken history to {}", moved.display()),
                    Err(e) => log::warn!("Failed to quarantine {}: {}", path.display(), e),
                }
                Vec::new()
            }
        };

        let mut history = Self {
            path,
            limit: limit.max(1),
            entries: entries.into(),
        };
        history.truncate();
        history
    }

    /// Read a history file without modifying it
    ///
    /// A missing file is an empty history.
    pub fn read(path: &Path) -> Result<Vec<Sample>, AppError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let entries = serde_json::from_str(&content).map_err(crate::error::ConfigError::from)?;
        Ok(entries)
    }

    /// Append a sample and persist the history
    pub fn append(&mut self, sample: Sample) -> Result<(), AppError> {
        self.entries.push_back(sample);
        self.truncate();
        self.save()
    }

    /// Stored samples, oldest first
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &Sample> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn truncate(&mut self) {
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }

    /// Write via a temporary file so readers never see a partial array
    fn save(&self) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(crate::error::ConfigError::from)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Rename a broken history file to `<unix-ts>-broken-history.json`
fn quarantine(path: &Path) -> std::io::Result<PathBuf> {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let target = path.with_file_name(format!("{}-{}", stamp, BROKEN_SUFFIX));
    std::fs::rename(path, &target)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use std::time::Duration;

    fn sample(cpu: u32, minute: u32) -> Sample {
        let ts = Local.with_ymd_and_hms(2024, 3, 1, 12, minute, 0).unwrap();
        Sample::at(cpu, 40, ts, Duration::from_secs(60))
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = SampleHistory::open(dir.path().join("history.json"), 10);
        assert!(history.is_empty());
    }

    #[test]
    fn test_append_persists_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut history = SampleHistory::open(&path, 2);
        history.append(sample(10, 0)).unwrap();
        history.append(sample(20, 1)).unwrap();
        history.append(sample(30, 2)).unwrap();
        assert_eq!(history.len(), 2);

        let stored = SampleHistory::read(&path).unwrap();
        let cpus: Vec<u32> = stored.iter().map(|s| s.average_cpu).collect();
        assert_eq!(cpus, vec![20, 30]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_reopen_keeps_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut history = SampleHistory::open(&path, 10);
        history.append(sample(55, 0)).unwrap();

        let reopened = SampleHistory::open(&path, 10);
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.entries().next().unwrap().average_cpu, 55);
    }

    #[test]
    fn test_broken_file_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{ not json").unwrap();

        let history = SampleHistory::open(&path, 10);
        assert!(history.is_empty());
        assert!(!path.exists());

        let moved: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(BROKEN_SUFFIX))
            .collect();
        assert_eq!(moved.len(), 1);
    }
}
