//! Process configuration read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Queue backend location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
}

impl RedisConfig {
    pub fn url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
        }
    }
}

/// Identity used as the sender of notification messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderConfig {
    pub name: String,
    pub address: String,
}

impl SenderConfig {
    /// `Name <address>` form used in the `from` header.
    pub fn mailbox(&self) -> String {
        format!("{} <{}>", self.name, self.address)
    }
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            name: "Files Manager".to_string(),
            address: "noreply@localhost".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub redis: RedisConfig,
    pub sender: SenderConfig,
    /// Executions allowed per job before it is dead-lettered.
    pub max_attempts: u32,
    pub poll_interval: Duration,
    /// How long a claimed job may stay unsettled before it is redelivered.
    pub lease_timeout: Duration,
    /// JSON snapshot of files and users served by the record lookup service.
    pub records_path: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            redis: RedisConfig::default(),
            sender: SenderConfig::default(),
            max_attempts: 5,
            poll_interval: Duration::from_millis(1000),
            lease_timeout: Duration::from_secs(300),
            records_path: None,
        }
    }
}

impl WorkerConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let redis = RedisConfig {
            host: lookup("RD_HOST").unwrap_or(defaults.redis.host),
            port: parse_or(&lookup, "RD_PORT", defaults.redis.port)?,
        };
        let sender = SenderConfig {
            name: lookup("EMAIL_NAME").unwrap_or(defaults.sender.name),
            address: lookup("EMAIL_ADD").unwrap_or(defaults.sender.address),
        };
        let max_attempts = parse_or(&lookup, "FILEJOBS_MAX_ATTEMPTS", defaults.max_attempts)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "FILEJOBS_MAX_ATTEMPTS",
                value: "0".to_string(),
            });
        }
        let poll_ms = parse_or(
            &lookup,
            "FILEJOBS_POLL_INTERVAL_MS",
            defaults.poll_interval.as_millis() as u64,
        )?;
        let lease_secs = parse_or(
            &lookup,
            "FILEJOBS_LEASE_TIMEOUT_SECS",
            defaults.lease_timeout.as_secs(),
        )?;
        if lease_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "FILEJOBS_LEASE_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            redis,
            sender,
            max_attempts,
            poll_interval: Duration::from_millis(poll_ms),
            lease_timeout: Duration::from_secs(lease_secs),
            records_path: lookup("FILEJOBS_RECORDS").map(PathBuf::from),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
