//! CLI argument definitions using clap derive
//!
//! Defines all command-line arguments and subcommands.

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Host CPU/RAM watcher
///
/// Averages CPU and memory usage over sliding windows and notifies when a
/// sustained peak starts and when it ends.
#[derive(Parser, Debug)]
#[command(name = "perfwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "PERFWATCH_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start sampling and alerting
    Run(RunArgs),

    /// Show configured alert definitions
    Rules,

    /// Validate configuration and channel keys
    Check,

    /// List devices a channel can deliver to
    Devices {
        /// Channel name from the configuration
        channel: String,
    },

    /// Show the recent sample history
    Log(LogArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Seconds between raw readings
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// Raw readings averaged into one sample
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub samples: Option<u64>,

    /// Stop after this many samples
    #[arg(long, value_name = "N")]
    pub once: Option<usize>,

    /// Override the sample history file
    #[arg(long)]
    pub history: Option<PathBuf>,
}

/// Arguments for the log command
#[derive(Parser, Debug)]
pub struct LogArgs {
    /// Number of most recent samples to show
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,

    /// History file to read instead of the configured one
    #[arg(long)]
    pub file: Option<PathBuf>,
}

/// Output format
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}

/// Generate shell completions and print to stdout
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_rules() {
        let args = Cli::try_parse_from(["perfwatch", "rules"]).unwrap();
        assert!(matches!(args.command, Commands::Rules));
    }

    #[test]
    fn test_cli_parse_verbose() {
        let args = Cli::try_parse_from(["perfwatch", "-v", "check"]).unwrap();
        assert!(args.verbose);
        assert!(matches!(args.command, Commands::Check));
    }

    #[test]
    fn test_cli_parse_run_args() {
        let args = Cli::try_parse_from([
            "perfwatch",
            "run",
            "--interval",
            "2",
            "--samples",
            "3",
            "--once",
            "5",
        ])
        .unwrap();

        if let Commands::Run(run) = args.command {
            assert_eq!(run.interval, Some(2));
            assert_eq!(run.samples, Some(3));
            assert_eq!(run.once, Some(5));
            assert!(run.history.is_none());
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_run_interval_validation() {
        let result = Cli::try_parse_from(["perfwatch", "run", "--interval", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_devices() {
        let args = Cli::try_parse_from(["perfwatch", "devices", "phone"]).unwrap();
        if let Commands::Devices { channel } = args.command {
            assert_eq!(channel, "phone");
        } else {
            panic!("Expected Devices command");
        }
    }

    #[test]
    fn test_cli_parse_log_limit() {
        let args = Cli::try_parse_from(["perfwatch", "log", "-n", "5"]).unwrap();
        if let Commands::Log(log) = args.command {
            assert_eq!(log.limit, 5);
        } else {
            panic!("Expected Log command");
        }
    }

    #[test]
    fn test_cli_format_json() {
        let args = Cli::try_parse_from(["perfwatch", "--format", "json", "rules"]).unwrap();
        assert!(matches!(args.format, OutputFormat::Json));
    }
}
