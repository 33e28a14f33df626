use std::{net::SocketAddr, time::Duration};

use anyhow::{Context, Result};

use crate::assembler::DEFAULT_MAX_DAYS;

pub const SOURCE_URL: &str = "CURS_SOURCE_URL";
pub const FETCH_TIMEOUT_SECS: &str = "CURS_FETCH_TIMEOUT_SECS";
pub const CONCURRENCY: &str = "CURS_CONCURRENCY";
pub const DEADLINE_SECS: &str = "CURS_DEADLINE_SECS";
pub const CACHE_TTL_SECS: &str = "CURS_CACHE_TTL_SECS";
pub const BIND: &str = "CURS_BIND";
pub const MAX_DAYS: &str = "CURS_MAX_DAYS";

const DEFAULT_SOURCE_URL: &str = "https://www.bnm.md/en/official_exchange_rates";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub source_url: String,
    pub fetch_timeout: Duration,
    pub concurrency: usize,
    pub deadline: Option<Duration>,
    pub max_days: i64,
    pub cache_ttl: Duration,
    pub bind: SocketAddr,
}

impl Config {
    /// Reads the process environment; `.env` is merged into it at startup.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source_url = lookup(SOURCE_URL).unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string());

        let fetch_timeout = Duration::from_secs(parse_or(&lookup, FETCH_TIMEOUT_SECS, 10)?);
        let concurrency = parse_or(&lookup, CONCURRENCY, 5usize)?;
        if concurrency == 0 {
            anyhow::bail!("{} must be at least 1", CONCURRENCY);
        }

        let deadline = match lookup(DEADLINE_SECS) {
            Some(raw) => Some(Duration::from_secs(
                raw.trim()
                    .parse()
                    .with_context(|| format!("Invalid {}: {}", DEADLINE_SECS, raw))?,
            )),
            None => None,
        };

        let max_days = parse_or(&lookup, MAX_DAYS, DEFAULT_MAX_DAYS)?;
        if max_days < 1 {
            anyhow::bail!("{} must be at least 1", MAX_DAYS);
        }

        let cache_ttl = Duration::from_secs(parse_or(&lookup, CACHE_TTL_SECS, 3600)?);

        let bind = lookup(BIND).unwrap_or_else(|| "127.0.0.1:8080".to_string());
        let bind = bind
            .parse()
            .with_context(|| format!("Invalid {}: {}", BIND, bind))?;

        Ok(Config {
            source_url,
            fetch_timeout,
            concurrency,
            deadline,
            max_days,
            cache_ttl,
            bind,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {}", key, raw)),
        None => Ok(default),
    }
}
