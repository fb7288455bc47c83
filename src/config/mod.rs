//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast on malformed values. Every variable
//! has a default, so an empty environment yields a working local setup.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_BRIDGE_ADDR: &str = "127.0.0.1:8765";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_HISTORY_MAX: i64 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    /// Where the executor bridge listens.
    pub bridge_addr: SocketAddr,
    /// Dispatcher poll fallback when no submission wakes it.
    pub poll_interval: Duration,
    /// Cap applied to history reads from the inspection surfaces.
    pub history_max: i64,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let bridge_addr = optional_var("MCQ_BRIDGE_ADDR")
            .unwrap_or_else(|| DEFAULT_BRIDGE_ADDR.to_string());
        let bridge_addr: SocketAddr = bridge_addr.parse().map_err(|e| {
            Error::Config(format!("MCQ_BRIDGE_ADDR '{bridge_addr}' is not a socket address: {e}"))
        })?;

        let poll_ms: u64 = parsed_var("MCQ_POLL_INTERVAL_MS")?.unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        if poll_ms == 0 {
            return Err(Error::Config(
                "MCQ_POLL_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }

        let history_max: i64 = parsed_var("MCQ_HISTORY_MAX")?.unwrap_or(DEFAULT_HISTORY_MAX);
        if history_max <= 0 {
            return Err(Error::Config(
                "MCQ_HISTORY_MAX must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            bridge_addr,
            poll_interval: Duration::from_millis(poll_ms),
            history_max,
            otel_endpoint: optional_var("OTEL_ENDPOINT"),
            log_level: optional_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// Unset and empty are treated alike.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_var(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| Error::Config(format!("{name} '{raw}' is invalid: {e}")))
        })
        .transpose()
}
