//! Configuration management for ttyline.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file (JSON)
//! 3. Default values

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Library configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Terminal construction settings.
    pub terminal: TerminalSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Terminal configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalSection {
    /// Terminal type used for capability lookup; `None` picks the
    /// backend's default.
    #[serde(rename = "type")]
    pub term_type: Option<String>,
    /// Character encoding name reported by the terminal.
    pub encoding: String,
    /// Device driven by the POSIX backend.
    pub device: String,
    /// Path of the `stty` tool.
    pub stty: String,
    /// Capacity of the cooked-input pipe in bytes.
    pub pipe_capacity: usize,
    /// How long a pump blocks on its source before checking for a stop.
    pub poll_interval_ms: u64,
    /// Upper bound on waiting for a pump thread to exit.
    pub pump_join_timeout_ms: u64,
}

impl Default for TerminalSection {
    fn default() -> Self {
        Self {
            term_type: None,
            encoding: "UTF-8".to_string(),
            device: "/dev/tty".to_string(),
            stty: "stty".to_string(),
            pipe_capacity: crate::stream::DEFAULT_CAPACITY,
            poll_interval_ms: 50,
            pump_join_timeout_ms: 2000,
        }
    }
}

impl TerminalSection {
    /// Pump poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Pump join timeout.
    pub fn pump_join_timeout(&self) -> Duration {
        Duration::from_millis(self.pump_join_timeout_ms)
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level or filter directive (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_vars<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| var(name).filter(|v| !v.is_empty());

        if let Some(term_type) = non_empty("TTYLINE_TYPE").or_else(|| non_empty("TERM")) {
            self.terminal.term_type = Some(term_type);
        }

        if let Some(device) = non_empty("TTYLINE_DEVICE") {
            self.terminal.device = device;
        }

        if let Some(stty) = non_empty("TTYLINE_STTY") {
            self.terminal.stty = stty;
        }

        if let Some(level) = non_empty("TTYLINE_LOG_LEVEL").or_else(|| non_empty("RUST_LOG")) {
            self.logging.level = level;
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: env vars > config file > defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
