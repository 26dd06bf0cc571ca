use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use anyhow::{Context, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreboardConfig {
    /// Penalty minutes charged for every rejected attempt on a solved problem.
    #[serde(default = "default_penalty_per_wrong")]
    pub penalty_per_wrong: u64,
}

impl Default for ScoreboardConfig {
    fn default() -> Self {
        Self {
            penalty_per_wrong: default_penalty_per_wrong(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file_enabled: bool,
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_file_name")]
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_enabled: false,
            directory: default_log_directory(),
            file_name: default_log_file_name(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct OutputConfig {
    /// When set, every scroll is appended to this file as one NDJSON record.
    #[serde(default)]
    pub scroll_log: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BoardConfig {
    #[serde(default)]
    pub scoreboard: ScoreboardConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_penalty_per_wrong() -> u64 {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_file_name() -> String {
    "icpc-board.log".to_string()
}

pub fn parse_board_config(raw: &str) -> Result<BoardConfig> {
    toml::from_str::<BoardConfig>(raw).context("Failed to parse board config")
}

/// Reads the config at `path`; `None` when no file exists.
pub fn read_board_config(path: &Path) -> Result<Option<BoardConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;

    parse_board_config(&raw)
        .map(Some)
        .with_context(|| format!("Invalid config at {}", path.display()))
}

/// Reports where the active config came from. Runs once tracing is up.
pub fn log_config_source(path: &Path, found: bool) {
    if found {
        info!("Loaded config from {}", path.display());
    } else {
        info!("Config not found, using defaults: {}", path.display());
    }
}
