//! Configuration management for the ticket tracker.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Missing or unparsable values fall back to the default.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Period of the background reload in milliseconds
    pub refresh_interval_ms: u64,
    /// Upper bound of the simulated backend latency in milliseconds
    pub backend_max_latency_ms: u64,
    /// Search debounce in milliseconds
    pub search_debounce_ms: u64,
    /// Initial rows per page of the ticket table
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 10_000,
            backend_max_latency_ms: 4_000,
            search_debounce_ms: 300,
            page_size: 10,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// - `TICKETS_REFRESH_INTERVAL_MS` (default 10000)
    /// - `TICKETS_BACKEND_MAX_LATENCY_MS` (default 4000)
    /// - `TICKETS_SEARCH_DEBOUNCE_MS` (default 300)
    /// - `TICKETS_PAGE_SIZE` (default 10, zero is rejected)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let read = |key: &str, default| parse_or(lookup(key), default);

        Self {
            refresh_interval_ms: read("TICKETS_REFRESH_INTERVAL_MS", defaults.refresh_interval_ms),
            backend_max_latency_ms: read("TICKETS_BACKEND_MAX_LATENCY_MS", defaults.backend_max_latency_ms),
            search_debounce_ms: read("TICKETS_SEARCH_DEBOUNCE_MS", defaults.search_debounce_ms),
            page_size: Some(parse_or(lookup("TICKETS_PAGE_SIZE"), defaults.page_size))
                .filter(|size| *size > 0)
                .unwrap_or(defaults.page_size),
        }
    }

    /// Background reload period
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Simulated backend latency bound
    #[must_use]
    pub const fn backend_max_latency(&self) -> Duration {
        Duration::from_millis(self.backend_max_latency_ms)
    }

    /// Search debounce
    #[must_use]
    pub const fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(config(&[]), Config::default());
        assert_eq!(Config::default().refresh_interval(), Duration::from_secs(10));
        assert_eq!(Config::default().backend_max_latency(), Duration::from_secs(4));
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("TICKETS_REFRESH_INTERVAL_MS", "2500"),
            ("TICKETS_BACKEND_MAX_LATENCY_MS", " 0 "),
            ("TICKETS_SEARCH_DEBOUNCE_MS", "50"),
            ("TICKETS_PAGE_SIZE", "25"),
        ]);
        assert_eq!(config.refresh_interval(), Duration::from_millis(2500));
        assert_eq!(config.backend_max_latency(), Duration::ZERO);
        assert_eq!(config.search_debounce(), Duration::from_millis(50));
        assert_eq!(config.page_size, 25);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = config(&[
            ("TICKETS_REFRESH_INTERVAL_MS", "soon"),
            ("TICKETS_SEARCH_DEBOUNCE_MS", "-1"),
            ("TICKETS_PAGE_SIZE", "0"),
        ]);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn serializes_to_json() -> Result<(), serde_json::Error> {
        let json = serde_json::to_value(Config::default())?;
        assert_eq!(json["page_size"], 10);
        assert_eq!(json["search_debounce_ms"], 300);
        Ok(())
    }
}
