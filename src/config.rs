//! Runtime configuration.
//!
//! Settings come from the process environment, optionally seeded from a
//! `.env` file via `dotenv`. Threshold tables default to the built-in version
//! and can be replaced by a TOML file named in `ETVEG_TABLES`.

use std::env;
use std::fs;
use std::path::Path;

use crate::classify::AnalysisTables;
use crate::logging::{self, Component, LogLevel};

pub const ENV_API_KEY: &str = "OPENET_API_KEY";
pub const ENV_LOG_LEVEL: &str = "ETVEG_LOG_LEVEL";
pub const ENV_LOG_FILE: &str = "ETVEG_LOG_FILE";
pub const ENV_TABLES: &str = "ETVEG_TABLES";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The table file could not be read.
    Io(String),
    /// The table file is not valid TOML for the expected layout.
    Parse(String),
    /// The file parsed but its contents violate a table invariant.
    Invalid(String),
    /// An environment variable holds a value that cannot be used.
    BadSetting { name: String, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
            ConfigError::BadSetting { name, value } => {
                write!(f, "Invalid value '{}' for {}", value, name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_key: Option<String>,
    pub log_level: LogLevel,
    pub log_file: Option<String>,
    pub tables_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            log_level: LogLevel::Info,
            log_file: None,
            tables_path: None,
        }
    }
}

impl Settings {
    /// Loads `.env` (if present) and reads settings from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let log_level = match non_empty(ENV_LOG_LEVEL) {
            Some(raw) => raw.parse::<LogLevel>().map_err(|_| ConfigError::BadSetting {
                name: ENV_LOG_LEVEL.to_string(),
                value: raw.clone(),
            })?,
            None => LogLevel::Info,
        };

        Ok(Self {
            api_key: non_empty(ENV_API_KEY),
            log_level,
            log_file: non_empty(ENV_LOG_FILE),
            tables_path: non_empty(ENV_TABLES),
        })
    }
}

// ---------------------------------------------------------------------------
// Threshold tables
// ---------------------------------------------------------------------------

/// Reads and validates a TOML table file.
pub fn load_tables_file<P: AsRef<Path>>(path: P) -> Result<AnalysisTables, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    AnalysisTables::from_toml_str(&text)
}

/// Returns the tables named in settings, or the built-in tables.
pub fn load_tables(settings: &Settings) -> Result<AnalysisTables, ConfigError> {
    match &settings.tables_path {
        Some(path) => {
            let tables = load_tables_file(path)?;
            logging::info(
                Component::Config,
                Some(path.as_str()),
                &format!("Loaded threshold tables version {}", tables.version),
            );
            Ok(tables)
        }
        None => {
            logging::debug(Component::Config, None, "Using built-in threshold tables");
            Ok(AnalysisTables::default())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
