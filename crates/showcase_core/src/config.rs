//! Explicit runtime configuration.
//!
//! # Responsibility
//! - Load settings from environment-style key/value sources.
//! - Hand typed settings to services at construction time.
//!
//! # Invariants
//! - Configuration is a plain value; nothing here is process-global.
//! - Missing keys fall back to defaults, malformed values are errors.

use crate::feed::query::clamp_limit;
use crate::logging::{default_log_level, normalize_level};
use log::{info, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DB_PATH_KEY: &str = "SHOWCASE_DB_PATH";
pub const LOG_LEVEL_KEY: &str = "SHOWCASE_LOG_LEVEL";
pub const LOG_DIR_KEY: &str = "SHOWCASE_LOG_DIR";
pub const PAGE_SIZE_KEY: &str = "SHOWCASE_PAGE_SIZE";

const DEFAULT_DB_PATH: &str = "showcase.sqlite3";
const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Feed defaults consumed by `ProjectService`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSettings {
    /// Page size used when a request carries no limit. Always in `[1, 100]`.
    pub default_page_size: u32,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Process configuration for the showcase core and its frontends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowcaseConfig {
    pub db_path: PathBuf,
    /// Normalized `trace|debug|info|warn|error`.
    pub log_level: &'static str,
    /// Absolute directory for rolling log files; logging is off when unset.
    pub log_dir: Option<PathBuf>,
    pub feed: FeedSettings,
}

impl Default for ShowcaseConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: default_log_level(),
            log_dir: None,
            feed: FeedSettings::default(),
        }
    }
}

impl ShowcaseConfig {
    /// Loads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let db_path = match non_empty(lookup(DB_PATH_KEY)) {
            Some(value) => PathBuf::from(value),
            None => {
                info!(
                    "event=config_default module=config key={} value={}",
                    DB_PATH_KEY, DEFAULT_DB_PATH
                );
                defaults.db_path
            }
        };

        let log_level = match non_empty(lookup(LOG_LEVEL_KEY)) {
            Some(value) => normalize_level(&value).map_err(|reason| ConfigError::InvalidValue {
                key: LOG_LEVEL_KEY,
                value: value.clone(),
                reason,
            })?,
            None => defaults.log_level,
        };

        let log_dir = match non_empty(lookup(LOG_DIR_KEY)) {
            Some(value) if Path::new(&value).is_absolute() => Some(PathBuf::from(value)),
            Some(value) => {
                return Err(ConfigError::InvalidValue {
                    key: LOG_DIR_KEY,
                    value,
                    reason: "must be an absolute path".to_string(),
                })
            }
            None => None,
        };

        let feed = match non_empty(lookup(PAGE_SIZE_KEY)) {
            Some(value) => {
                let parsed = value
                    .parse::<i64>()
                    .map_err(|err| ConfigError::InvalidValue {
                        key: PAGE_SIZE_KEY,
                        value: value.clone(),
                        reason: err.to_string(),
                    })?;
                let default_page_size = clamp_limit(parsed);
                if i64::from(default_page_size) != parsed {
                    warn!(
                        "event=config_clamped module=config key={} requested={} applied={}",
                        PAGE_SIZE_KEY, parsed, default_page_size
                    );
                }
                FeedSettings { default_page_size }
            }
            None => defaults.feed,
        };

        Ok(Self {
            db_path,
            log_level,
            log_dir,
            feed,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}
