//! perfwatch - host CPU/RAM watcher
//!
//! Samples CPU and memory usage, averages it over sliding windows and
//! notifies when a sustained peak starts and ends.

use clap::Parser;
use perfwatch::cli::args::{generate_completions, Cli, Commands};
use perfwatch::commands::{run_check, run_devices, run_log, run_monitor, run_rules};
use perfwatch::error::{AppError, ConfigError, NotifyError};

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Set log level based on verbose flag
    if cli.verbose {
        log::set_max_level(log::LevelFilter::Debug);
    }

    // Run the appropriate command
    let result = run(&cli);

    if let Err(e) = result {
        log::error!("{}", e);
        print_error(&e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), AppError> {
    let config = cli.config.as_deref();

    match &cli.command {
        Commands::Run(args) => run_monitor(args, cli.format, config, cli.verbose),

        Commands::Rules => run_rules(cli.format, config),

        Commands::Check => run_check(cli.format, config),

        Commands::Devices { channel } => run_devices(channel, cli.format, config),

        Commands::Log(args) => run_log(args, cli.format, config),

        Commands::Completions { shell } => {
            generate_completions(*shell);
            Ok(())
        }
    }
}

fn print_error(err: &AppError) {
    eprintln!("Error: {}", err);

    // Print helpful hints for common errors
    match err {
        AppError::Config(ConfigError::FileNotFound(_)) => {
            eprintln!();
            eprintln!("Hint: Pass a config with -c/--config or set PERFWATCH_CONFIG.");
            eprintln!("      Without one, ~/.config/perfwatch/config.toml is used if present.");
        }
        AppError::Config(ConfigError::MissingField(field)) if field == "general.history_file" => {
            eprintln!();
            eprintln!("Hint: Set history_file under [general] or pass --file.");
        }
        AppError::Notify(NotifyError::MissingKey) | AppError::Notify(NotifyError::KeyRejected) => {
            eprintln!();
            eprintln!("Hint: Check the channel's key with 'perfwatch check'.");
        }
        AppError::ChannelNotFound(_) => {
            eprintln!();
            eprintln!("Hint: List configured channels with 'perfwatch check'.");
        }
        _ => {}
    }
}
