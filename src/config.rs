use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::guard::{DEFAULT_COOLDOWN, DEFAULT_LOGIN_ROUTE};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";
pub const DEFAULT_DB_FILE: &str = "fieldtask.db";

pub const ENV_BASE_URL: &str = "FIELDTASK_BASE_URL";
pub const ENV_DB_PATH: &str = "FIELDTASK_DB_PATH";
pub const ENV_LOGIN_ROUTE: &str = "FIELDTASK_LOGIN_ROUTE";
pub const ENV_LOGIN_CHECK_COOLDOWN_MS: &str = "FIELDTASK_LOGIN_CHECK_COOLDOWN_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Origin every relative request path is appended to.
    pub base_url: String,
    pub db_path: PathBuf,
    pub login_route: String,
    pub login_check_cooldown_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            login_check_cooldown_ms: DEFAULT_COOLDOWN.as_millis() as u64,
        }
    }
}

impl Config {
    /// Defaults, then the TOML file if given, then environment overrides.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };

        config.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_toml_str(raw: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        if let Some(value) = lookup(ENV_BASE_URL) {
            self.base_url = value;
        }
        if let Some(value) = lookup(ENV_DB_PATH) {
            self.db_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_LOGIN_ROUTE) {
            self.login_route = value;
        }
        if let Some(value) = lookup(ENV_LOGIN_CHECK_COOLDOWN_MS) {
            self.login_check_cooldown_ms =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: ENV_LOGIN_CHECK_COOLDOWN_MS,
                        value,
                    })?;
        }
        Ok(self)
    }

    pub fn login_check_cooldown(&self) -> Duration {
        Duration::from_millis(self.login_check_cooldown_ms)
    }
}
