//! Configuration module for peerwatch.
//!
//! This module handles parsing configuration from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `PEERWATCH_PEER_DIRS` | No | - | Comma-separated peer configuration directories |
//! | `PEERWATCH_LOG_FORMAT` | No | `text` | Log output format: `text` or `json` |
//!
//! Directories given on the command line are appended to those from the
//! environment. At least one directory must be configured.
//!
//! # Example
//!
//! ```no_run
//! use peerwatch::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Watching {} directories", config.peer_dirs.len());
//! ```

use std::env;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Environment variable holding the peer directories.
const PEER_DIRS_VAR: &str = "PEERWATCH_PEER_DIRS";

/// Environment variable selecting the log format.
const LOG_FORMAT_VAR: &str = "PEERWATCH_LOG_FORMAT";

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Neither the environment nor the command line named a directory.
    #[error("no peer directories configured (set PEERWATCH_PEER_DIRS or pass directories)")]
    NoPeerDirectories,
}

/// Log output format for the binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per log event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected 'text' or 'json', got '{other}'")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => f.write_str("text"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

/// Configuration for the peerwatch binary.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directories to watch, in registration order.
    pub peer_dirs: Vec<String>,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Config {
    /// Creates a new `Config` from environment variables alone.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - no peer directory is configured
    /// - `PEERWATCH_LOG_FORMAT` is set to something other than `text` or `json`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_dirs(Vec::new())
    }

    /// Creates a new `Config`, appending `extra_dirs` (typically command-line
    /// arguments) to the directories from the environment.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_env_with_dirs(extra_dirs: Vec<String>) -> Result<Self, ConfigError> {
        // Optional: PEERWATCH_PEER_DIRS (comma-separated)
        let mut peer_dirs: Vec<String> = env::var(PEER_DIRS_VAR)
            .map(|val| {
                val.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        peer_dirs.extend(extra_dirs.into_iter().filter(|d| !d.is_empty()));

        if peer_dirs.is_empty() {
            return Err(ConfigError::NoPeerDirectories);
        }

        // Optional: PEERWATCH_LOG_FORMAT (default: text)
        let log_format = match env::var(LOG_FORMAT_VAR) {
            Ok(val) => val
                .parse::<LogFormat>()
                .map_err(|message| ConfigError::InvalidValue {
                    key: LOG_FORMAT_VAR.to_string(),
                    message,
                })?,
            Err(_) => LogFormat::default(),
        };

        Ok(Self {
            peer_dirs,
            log_format,
        })
    }
}
