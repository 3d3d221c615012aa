//! Environment settings that goose's own command line does not cover.
//!
//! Users, hatch rate, run time and request timeout are goose flags
//! (`--users`, `--hatch-rate`, `--run-time`, `--timeout`).

use std::{str::FromStr, time::Duration};

use crate::error::LoadError;

const DEFAULT_API_URL: &str = "http://localhost:4000";
const DEFAULT_INGEST_URL: &str = "http://localhost:3002";

#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Default host for goose; `--host` still wins.
    pub api_url: String,
    pub ingest_url: String,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ingest_url: DEFAULT_INGEST_URL.to_string(),
            min_wait: Duration::from_millis(10_000),
            max_wait: Duration::from_millis(30_000),
        }
    }
}

impl LoadConfig {
    pub fn from_env() -> Result<Self, LoadError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let ms = |key: &'static str| parse::<u64, _>(&lookup, key).map(|v| v.map(Duration::from_millis));

        let config = Self {
            api_url: base_url(lookup("STEPS_API_URL")).unwrap_or(defaults.api_url),
            ingest_url: base_url(lookup("STEPS_INGEST_URL")).unwrap_or(defaults.ingest_url),
            min_wait: ms("LOADGEN_MIN_WAIT_MS")?.unwrap_or(defaults.min_wait),
            max_wait: ms("LOADGEN_MAX_WAIT_MS")?.unwrap_or(defaults.max_wait),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        if self.min_wait > self.max_wait {
            return Err(LoadError::Config {
                key: "LOADGEN_MIN_WAIT_MS",
                value: format!(
                    "{} exceeds max wait {}",
                    self.min_wait.as_millis(),
                    self.max_wait.as_millis()
                ),
            });
        }
        Ok(())
    }
}

fn base_url(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
}

fn parse<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, LoadError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| LoadError::Config { key, value: raw }),
    }
}
