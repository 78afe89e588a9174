//! Game Log Monitor - live session statistics from a game's log file.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gamelog_monitor::config::{ConfigError, ConfigLoader};
use gamelog_monitor::display;
use gamelog_monitor::monitor::{read_log, LogMonitor, MonitorError, MonitorOptions};
use gamelog_monitor::watcher::{discover_log, StartPosition};

#[derive(Parser)]
#[command(
    name = "gamelog-monitor",
    about = "Live session statistics from a game log",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file to use instead of the default search paths.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the log and print statistics as they change.
    Watch {
        /// Log file; discovered in the usual install locations if omitted.
        path: Option<PathBuf>,
        /// Replay the existing content before following.
        #[arg(long)]
        replay: bool,
        /// Print each snapshot as a JSON line.
        #[arg(long)]
        json: bool,
        /// Poll interval in milliseconds.
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Poll on the timer only, without filesystem notifications.
        #[arg(long)]
        no_notify: bool,
    },
    /// Read the whole log once and print the statistics.
    Parse {
        /// Log file; discovered in the usual install locations if omitted.
        path: Option<PathBuf>,
        /// Print the statistics as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error("No log file given and none found in the default locations")]
    NoLogFile,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_options(path: Option<PathBuf>) -> Result<MonitorOptions, ConfigError> {
    let loader = path.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    loader.load_options()
}

fn resolve_path(path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    path.or_else(discover_log).ok_or(CliError::NoLogFile)
}

async fn run_watch(
    options: MonitorOptions,
    path: PathBuf,
    json: bool,
) -> Result<(), CliError> {
    let monitor = LogMonitor::new(options);
    monitor.subscribe(move |stats| {
        if json {
            display::print_json(stats);
        } else {
            display::print_snapshot(stats);
        }
    });

    monitor.start(&path).await?;
    if !json {
        display::print_monitor_start(&path.display().to_string());
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C, stopping");
    }

    monitor.stop().await;
    if !json {
        display::print_monitor_stop(&monitor.status());
        display::print_stats(&monitor.snapshot());
    }
    Ok(())
}

async fn run_parse(options: MonitorOptions, path: PathBuf, json: bool) -> Result<(), CliError> {
    tracing::info!(path = %path.display(), "Parsing log");
    let stats = read_log(&path, &options).await?;
    if json {
        display::print_json(&stats);
    } else {
        display::print_stats(&stats);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut options = load_options(cli.config)?;

    match cli.command {
        Commands::Watch {
            path,
            replay,
            json,
            interval_ms,
            no_notify,
        } => {
            if replay {
                options.tail.start = StartPosition::Beginning;
            }
            if let Some(ms) = interval_ms {
                options.poll_interval = Duration::from_millis(ms.max(1));
            }
            if no_notify {
                options.use_notifications = false;
            }
            let path = resolve_path(path)?;
            tracing::info!(
                path = %path.display(),
                interval = ?options.poll_interval,
                notifications = options.use_notifications,
                "Starting log monitor"
            );
            run_watch(options, path, json).await
        }
        Commands::Parse { path, json } => run_parse(options, resolve_path(path)?, json).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            display::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
