//! Process-level configuration, loaded once at `f1w-app` startup: typed
//! `from_env`, explicit parse errors, a `validate` pass.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} not set")]
    MissingEnvVar(String),
    #[error("failed to parse {name}: {source}")]
    ParseError { name: String, source: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    pub database_path: String,
    pub log_level: String,
    pub scheduler_tick_seconds: u64,
    pub global_concurrency: usize,
    pub per_indexer_concurrency: usize,
    pub stop_after_days: i64,
    pub jitter_seconds: i64,
    pub provider_base_url: String,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            database_path: "f1watch.sqlite3".to_string(),
            log_level: "info".to_string(),
            scheduler_tick_seconds: 600,
            global_concurrency: 3,
            per_indexer_concurrency: 1,
            stop_after_days: 14,
            jitter_seconds: 120,
            provider_base_url: "https://ergast-like-provider.example/api".to_string(),
        }
    }
}

impl WatcherConfig {
    pub fn from_env() -> ConfigResult<Self> {
        let defaults = Self::default();

        let database_path =
            env::var("F1W_DATABASE_PATH").unwrap_or(defaults.database_path);
        let log_level = env::var("F1W_LOG_LEVEL").unwrap_or(defaults.log_level);
        let scheduler_tick_seconds = parse_env_or(
            "F1W_SCHEDULER_TICK_SECONDS",
            defaults.scheduler_tick_seconds,
        )?;
        let global_concurrency =
            parse_env_or("F1W_GLOBAL_CONCURRENCY", defaults.global_concurrency)?;
        let per_indexer_concurrency = parse_env_or(
            "F1W_PER_INDEXER_CONCURRENCY",
            defaults.per_indexer_concurrency,
        )?;
        let stop_after_days = parse_env_or("F1W_STOP_AFTER_DAYS", defaults.stop_after_days)?;
        let jitter_seconds = parse_env_or("F1W_JITTER_SECONDS", defaults.jitter_seconds)?;
        let provider_base_url =
            env::var("F1W_PROVIDER_BASE_URL").unwrap_or(defaults.provider_base_url);

        let config = Self {
            database_path,
            log_level,
            scheduler_tick_seconds,
            global_concurrency,
            per_indexer_concurrency,
            stop_after_days,
            jitter_seconds,
            provider_base_url,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "log_level must be one of {:?}, got {}",
                valid_log_levels, self.log_level
            )));
        }
        if self.scheduler_tick_seconds == 0 {
            return Err(ConfigError::Invalid(
                "scheduler_tick_seconds must be greater than 0".to_string(),
            ));
        }
        if self.global_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "global_concurrency must be greater than 0".to_string(),
            ));
        }
        if self.per_indexer_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "per_indexer_concurrency must be greater than 0".to_string(),
            ));
        }
        if self.stop_after_days <= 0 {
            return Err(ConfigError::Invalid(
                "stop_after_days must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs(self.scheduler_tick_seconds)
    }
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> ConfigResult<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse::<T>().map_err(|e| ConfigError::ParseError {
            name: key.to_string(),
            source: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(WatcherConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = WatcherConfig::default();
        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_tick_interval() {
        let mut config = WatcherConfig::default();
        config.scheduler_tick_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_stop_after_days() {
        let mut config = WatcherConfig::default();
        config.stop_after_days = 0;
        assert!(config.validate().is_err());
    }
}
