//! Environment-driven configuration structures shared by all binaries.

use std::env;

use thiserror::Error;

use crate::model::WatchSet;

const DEFAULT_MAX_IN_FLIGHT: usize = 256;

/// Transaction filter settings. Immutable once loaded and read-only to the
/// streaming core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    transactions_enabled: bool,
    include_votes: bool,
    include_failed: bool,
    watched_owners: Vec<String>,
}

impl FilterConfig {
    pub fn new<I, S>(
        transactions_enabled: bool,
        include_votes: bool,
        include_failed: bool,
        watched_owners: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut owners: Vec<String> = Vec::new();
        for owner in watched_owners {
            let owner = owner.into();
            if !owner.is_empty() && !owners.contains(&owner) {
                owners.push(owner);
            }
        }

        Self {
            transactions_enabled,
            include_votes,
            include_failed,
            watched_owners: owners,
        }
    }

    /// Reads the `SUBSCRIBE_*` variables. Every entry is optional.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        let owners = get_optional_var("SUBSCRIBE_ACCOUNTS_INCLUDE").unwrap_or_default();
        Ok(Self::new(
            get_bool_var("SUBSCRIBE_TRANSACTIONS", true)?,
            get_bool_var("SUBSCRIBE_TRANSACTIONS_VOTE", false)?,
            get_bool_var("SUBSCRIBE_TRANSACTIONS_FAILED", false)?,
            owners.split(',').map(str::trim),
        ))
    }

    pub fn transactions_enabled(&self) -> bool {
        self.transactions_enabled
    }

    pub fn include_votes(&self) -> bool {
        self.include_votes
    }

    pub fn include_failed(&self) -> bool {
        self.include_failed
    }

    /// Owners in configuration order, without duplicates.
    pub fn watched_owners(&self) -> &[String] {
        &self.watched_owners
    }

    pub fn watch_set(&self) -> WatchSet {
        WatchSet::new(self.watched_owners.iter().cloned())
    }
}

/// Everything the monitor binary needs to open a stream and run a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    geyser_endpoint: String,
    x_token: Option<String>,
    insecure: bool,
    max_in_flight: usize,
    snapshot_dir: Option<String>,
    filter: FilterConfig,
}

impl MonitorConfig {
    /// Loads configuration by hydrating `.env` (if present) and reading the
    /// process variables. Missing or malformed entries surface as
    /// `ConfigError` so the binary can exit with a readable message.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        let geyser_endpoint = get_required_var("GEYSER_ENDPOINT")?;
        let max_in_flight = match get_optional_var("MONITOR_MAX_IN_FLIGHT") {
            Some(raw) => {
                let parsed: usize =
                    raw.parse()
                        .map_err(|source| ConfigError::InvalidNumber {
                            key: "MONITOR_MAX_IN_FLIGHT",
                            source,
                        })?;
                if parsed == 0 {
                    return Err(ConfigError::ZeroLimit {
                        key: "MONITOR_MAX_IN_FLIGHT",
                    });
                }
                parsed
            }
            None => DEFAULT_MAX_IN_FLIGHT,
        };

        Ok(Self {
            geyser_endpoint,
            x_token: get_optional_var("GEYSER_X_TOKEN"),
            insecure: get_bool_var("GEYSER_INSECURE", false)?,
            max_in_flight,
            snapshot_dir: get_optional_var("MONITOR_SNAPSHOT_DIR"),
            filter: FilterConfig::load_from_env()?,
        })
    }

    pub fn geyser_endpoint(&self) -> &str {
        &self.geyser_endpoint
    }

    pub fn x_token(&self) -> Option<&str> {
        self.x_token.as_deref()
    }

    pub fn insecure(&self) -> bool {
        self.insecure
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    pub fn snapshot_dir(&self) -> Option<&str> {
        self.snapshot_dir.as_deref()
    }

    pub fn filter(&self) -> &FilterConfig {
        &self.filter
    }
}

fn get_required_var(key: &'static str) -> Result<String, ConfigError> {
    get_optional_var(key).ok_or(ConfigError::MissingVar { key })
}

fn get_optional_var(key: &'static str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn get_bool_var(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = get_optional_var(key) else {
        return Ok(default);
    };

    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool { key, value }),
    }
}

pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if env::var_os("BALANCE_WATCH_SKIP_DOTENV").is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConfigError::Dotenv { source: err }),
    }

    Ok(())
}

/// Errors emitted when `.env` hydration or environment parsing fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{key}`")]
    MissingVar { key: &'static str },
    #[error("invalid integer in `{key}`: {source}")]
    InvalidNumber {
        key: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("`{key}` must be greater than zero")]
    ZeroLimit { key: &'static str },
    #[error("invalid boolean `{value}` in `{key}`")]
    InvalidBool { key: &'static str, value: String },
    #[error("failed to load .env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },
}
