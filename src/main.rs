use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use icpc_board::services::config_loader::{self, LoggingConfig};
use icpc_board::services::contest_engine::ContestEngine;
use icpc_board::services::replay::{self, ReplaySummary};
use icpc_board::services::scroll_log::ScrollLog;
use tokio::io::BufReader;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "icpc-board")]
#[command(about = "Replay a judging command stream and print the live standings", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, default_value = "icpc-board.toml", env = "ICPC_BOARD_CONFIG")]
    config: PathBuf,

    /// Command stream to replay (defaults to stdin)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Append every scroll as an NDJSON record to this file
    #[arg(long)]
    scroll_log: Option<PathBuf>,
}

fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    // stdout carries the protocol
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let (file_layer, file_guard) = if config.file_enabled {
        let _ = fs::create_dir_all(&config.directory);
        let file_appender = tracing_appender::rolling::daily(&config.directory, &config.file_name);
        let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_writer)
            .with_target(true);
        (Some(layer), Some(file_guard))
    } else {
        (None, None)
    };

    let init_result = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if let Err(err) = init_result {
        eprintln!("tracing init failed: {err}");
        return None;
    }

    file_guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = config_loader::read_board_config(&cli.config)?;
    let found = loaded.is_some();
    let config = loaded.unwrap_or_default();
    let _log_guard = init_tracing(&config.logging);
    info!("Starting icpc-board");
    config_loader::log_config_source(&cli.config, found);

    let mut scroll_log = match cli.scroll_log.or(config.output.scroll_log.clone()) {
        Some(path) => Some(ScrollLog::open(&path)?),
        None => None,
    };
    let engine = ContestEngine::new(config.scoreboard.clone());
    let stdout = std::io::stdout();
    let out = std::io::BufWriter::new(stdout.lock());

    let summary: ReplaySummary = match cli.input {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("Failed to open input '{}'", path.display()))?;
            replay::replay(BufReader::new(file), out, engine, scroll_log.as_mut()).await?
        }
        None => {
            replay::replay(BufReader::new(tokio::io::stdin()), out, engine, scroll_log.as_mut())
                .await?
        }
    };
    info!(
        "Processed {} lines ({} skipped), {} submissions",
        summary.lines, summary.skipped, summary.submissions
    );
    Ok(())
}
