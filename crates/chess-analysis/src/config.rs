//! Configuration for engine processes and analysis defaults.
//!
//! Loaded from a TOML file (`chess-review.toml` by default). Every field has a
//! default, so a missing file or a partial file is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// How to launch and supervise one engine process.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine executable. Looked up in `PATH` when not absolute.
    pub path: PathBuf,
    /// Extra command-line arguments.
    pub args: Vec<String>,
    /// Time allowed for `uci`/`isready` to be answered.
    pub startup_timeout_ms: u64,
    /// Time allowed for the process to exit after `quit` before it is killed.
    pub quit_grace_ms: u64,
    /// Added on top of the search time budget before a search is cut off.
    pub response_margin_ms: u64,
    /// Time allowed for `bestmove` to arrive after `stop`.
    pub stop_grace_ms: u64,
    /// Upper bound on live engine processes. `0` means unbounded.
    pub max_processes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("stockfish"),
            args: Vec::new(),
            startup_timeout_ms: 10_000,
            quit_grace_ms: 1_000,
            response_margin_ms: 2_000,
            stop_grace_ms: 500,
            max_processes: 4,
        }
    }
}

impl EngineConfig {
    /// Config for the given executable with all other settings at their defaults.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn quit_grace(&self) -> Duration {
        Duration::from_millis(self.quit_grace_ms)
    }

    pub fn response_margin(&self) -> Duration {
        Duration::from_millis(self.response_margin_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

/// Defaults applied when a caller does not pick its own search budget.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisDefaults {
    /// Depth ceiling for the position before each move.
    pub depth: u32,
    /// Time budget in milliseconds for the position before each move.
    pub movetime_ms: u64,
    /// Number of game reports kept in the result cache.
    pub cache_capacity: usize,
}

impl Default for AnalysisDefaults {
    fn default() -> Self {
        Self {
            depth: 18,
            movetime_ms: 1_000,
            cache_capacity: 100,
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub engine: EngineConfig,
    pub analysis: AnalysisDefaults,
}

impl ReviewConfig {
    /// Default configuration file name, resolved against the working directory.
    pub const FILE_NAME: &'static str = "chess-review.toml";

    /// Loads the configuration from `path`, or from [`Self::FILE_NAME`] when
    /// `path` is `None`.
    ///
    /// An explicitly given path must exist. The default file is optional: when
    /// it is absent the built-in defaults are returned.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file cannot be read,
    /// or [`ConfigError::ParseError`] if the file contains invalid TOML.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(Self::FILE_NAME);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}
