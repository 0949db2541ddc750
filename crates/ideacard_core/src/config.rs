//! Explicit runtime configuration.
//!
//! # Responsibility
//! - Collect storage path, logging and listing caps into one value that
//!   callers construct and pass down; nothing here is process-global.
//! - Load an optional `.env` file before reading `IDEACARD_*` variables.
//!
//! # Invariants
//! - Listing caps are always positive.

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DEFAULT_DB_FILE_NAME: &str = "ideacard.sqlite3";
pub const DEFAULT_LIST_LIMIT: u32 = 1000;
pub const DEFAULT_TIMELINE_SCAN_LIMIT: u32 = 5000;

const ENV_DB_PATH: &str = "IDEACARD_DB_PATH";
const ENV_LOG_LEVEL: &str = "IDEACARD_LOG_LEVEL";
const ENV_LOG_DIR: &str = "IDEACARD_LOG_DIR";
const ENV_LIST_LIMIT: &str = "IDEACARD_LIST_LIMIT";
const ENV_TIMELINE_SCAN_LIMIT: &str = "IDEACARD_TIMELINE_SCAN_LIMIT";

/// Result caps applied by the card service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceLimits {
    /// Cap for active/deleted listings.
    pub list_limit: u32,
    /// Cap for the all-cards scan feeding the timeline.
    pub timeline_scan_limit: u32,
}

impl Default for ServiceLimits {
    fn default() -> Self {
        Self {
            list_limit: DEFAULT_LIST_LIMIT,
            timeline_scan_limit: DEFAULT_TIMELINE_SCAN_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// File logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub limits: ServiceLimits,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            limits: ServiceLimits::default(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidNumber { key: &'static str, value: String },
    ZeroLimit(&'static str),
    DotEnv(dotenvy::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNumber { key, value } => {
                write!(f, "{key} must be a positive integer, got `{value}`")
            }
            Self::ZeroLimit(key) => write!(f, "{key} must be greater than zero"),
            Self::DotEnv(err) => write!(f, "failed to load .env: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DotEnv(err) => Some(err),
            _ => None,
        }
    }
}

impl CoreConfig {
    /// Reads configuration from `.env` (when present) and the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(err) if err.not_found() => {}
            Err(err) => return Err(ConfigError::DotEnv(err)),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        Ok(Self {
            db_path: read(ENV_DB_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            log_level: read(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
            limits: ServiceLimits {
                list_limit: parse_limit(ENV_LIST_LIMIT, read(ENV_LIST_LIMIT))?
                    .unwrap_or(defaults.limits.list_limit),
                timeline_scan_limit: parse_limit(
                    ENV_TIMELINE_SCAN_LIMIT,
                    read(ENV_TIMELINE_SCAN_LIMIT),
                )?
                .unwrap_or(defaults.limits.timeline_scan_limit),
            },
        })
    }
}

fn parse_limit(key: &'static str, value: Option<String>) -> Result<Option<u32>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.parse::<u32>() {
        Ok(0) => Err(ConfigError::ZeroLimit(key)),
        Ok(limit) => Ok(Some(limit)),
        Err(_) => Err(ConfigError::InvalidNumber { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, DEFAULT_LIST_LIMIT, DEFAULT_TIMELINE_SCAN_LIMIT};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_lookup_yields_defaults() {
        let config = CoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.limits.list_limit, DEFAULT_LIST_LIMIT);
        assert_eq!(config.limits.timeline_scan_limit, DEFAULT_TIMELINE_SCAN_LIMIT);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn values_override_defaults() {
        let config = CoreConfig::from_lookup(lookup(&[
            ("IDEACARD_DB_PATH", "/tmp/cards.db"),
            ("IDEACARD_LOG_LEVEL", "warn"),
            ("IDEACARD_LOG_DIR", " /var/log/ideacard "),
            ("IDEACARD_LIST_LIMIT", "25"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/cards.db"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/ideacard")));
        assert_eq!(config.limits.list_limit, 25);
        assert_eq!(config.limits.timeline_scan_limit, DEFAULT_TIMELINE_SCAN_LIMIT);
    }

    #[test]
    fn bad_limits_are_rejected() {
        let err = CoreConfig::from_lookup(lookup(&[("IDEACARD_LIST_LIMIT", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { key: "IDEACARD_LIST_LIMIT", .. }));

        let err =
            CoreConfig::from_lookup(lookup(&[("IDEACARD_TIMELINE_SCAN_LIMIT", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroLimit("IDEACARD_TIMELINE_SCAN_LIMIT")));
    }
}
