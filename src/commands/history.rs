//! Log command implementation
//!
//! Shows the most recent samples from the on-disk history.

use super::load_config;
use crate::cli::args::{LogArgs, OutputFormat};
use crate::cli::output::{print_output, HistoryList};
use crate::domain::Sample;
use crate::error::{ConfigError, Result};
use crate::services::SampleHistory;

/// Execute the log command
pub fn run_log(args: &LogArgs, format: OutputFormat, config_path: Option<&str>) -> Result<()> {
    let path = match &args.file {
        Some(path) => path.clone(),
        None => {
            let (config, _) = load_config(config_path)?;
            config
                .general
                .history_file
                .ok_or_else(|| ConfigError::MissingField("general.history_file".to_string()))?
        }
    };

    let samples = SampleHistory::read(&path)?;
    let list = HistoryList {
        path: path.display().to_string(),
        samples: most_recent(samples, args.limit),
    };
    print_output(&list, format)?;

    Ok(())
}

fn most_recent(mut samples: Vec<Sample>, limit: usize) -> Vec<Sample> {
    let skip = samples.len().saturating_sub(limit);
    samples.drain(..skip);
    samples
}
