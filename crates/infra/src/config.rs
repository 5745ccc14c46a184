//! Configuration loading and representation.
//!
//! Defaults, overridden by environment variables:
//!
//! | variable | meaning |
//! |---|---|
//! | `KENNEL_DATA_PATH` | ledger JSON file |
//! | `KENNEL_ACTIVITY_CAP` | retained activity events (>= 1) |
//! | `KENNEL_REDUCE_MODE` | `clamped` or `strict` |

use std::path::PathBuf;

use thiserror::Error;

use kennel_inventory::{DEFAULT_ACTIVITY_CAP, ReduceMode};

pub const ENV_DATA_PATH: &str = "KENNEL_DATA_PATH";
pub const ENV_ACTIVITY_CAP: &str = "KENNEL_ACTIVITY_CAP";
pub const ENV_REDUCE_MODE: &str = "KENNEL_REDUCE_MODE";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub data_path: PathBuf,
    pub activity_cap: usize,
    pub reduce_mode: ReduceMode,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            activity_cap: DEFAULT_ACTIVITY_CAP,
            reduce_mode: ReduceMode::Clamped,
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DATA_PATH).filter(|p| !p.trim().is_empty()) {
            config.data_path = PathBuf::from(path);
        }

        if let Some(raw) = lookup(ENV_ACTIVITY_CAP) {
            config.activity_cap = match raw.trim().parse::<usize>() {
                Ok(cap) if cap > 0 => cap,
                Ok(_) => return Err(invalid(ENV_ACTIVITY_CAP, raw, "must be at least 1")),
                Err(e) => return Err(invalid(ENV_ACTIVITY_CAP, raw, e)),
            };
        }

        if let Some(raw) = lookup(ENV_REDUCE_MODE) {
            config.reduce_mode = raw
                .parse()
                .map_err(|e| invalid(ENV_REDUCE_MODE, raw.clone(), e))?;
        }

        Ok(config)
    }
}

fn invalid(key: &'static str, value: String, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        value,
        reason: reason.to_string(),
    }
}

/// `<data dir>/kennel/ledger.json`, or `./kennel-ledger.json` when the
/// platform has no data directory.
pub fn default_data_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("kennel").join("ledger.json"))
        .unwrap_or_else(|| PathBuf::from("kennel-ledger.json"))
}
