//! Environment configuration.
//!
//! | Variable                         | Default                                 |
//! |----------------------------------|-----------------------------------------|
//! | `FOOTPRINT_API_URL`              | `http://127.0.0.1:8001`                 |
//! | `FOOTPRINT_PORT`                 | `3000`                                  |
//! | `FOOTPRINT_SESSION_DB`           | `sqlite:footprint-session.db?mode=rwc`  |
//! | `FOOTPRINT_REQUEST_TIMEOUT_SECS` | `30`                                    |
//!
//! Unparseable values fall back to the default.

use std::env;
use std::time::Duration;

/// Default base URL of the remote footprint service.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8001";

/// Default port for the local gateway.
pub const DEFAULT_PORT: u16 = 3000;

/// Default location of the persisted session token.
pub const DEFAULT_SESSION_DB: &str = "sqlite:footprint-session.db?mode=rwc";

/// Default per-request timeout, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the remote service, without trailing slash.
    pub api_base_url: String,
    pub port: u16,
    pub session_db_url: String,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            port: DEFAULT_PORT,
            session_db_url: DEFAULT_SESSION_DB.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = lookup("FOOTPRINT_API_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.api_base_url);

        let port = lookup("FOOTPRINT_PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(defaults.port);

        let session_db_url = lookup("FOOTPRINT_SESSION_DB")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(defaults.session_db_url);

        let request_timeout = lookup("FOOTPRINT_REQUEST_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        Self {
            api_base_url,
            port,
            session_db_url,
            request_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("FOOTPRINT_API_URL", "http://footprint.local:9000/"),
            ("FOOTPRINT_PORT", "8080"),
            ("FOOTPRINT_REQUEST_TIMEOUT_SECS", "5"),
        ]));

        assert_eq!(config.api_base_url, "http://footprint.local:9000");
        assert_eq!(config.port, 8080);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.session_db_url, DEFAULT_SESSION_DB);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("FOOTPRINT_PORT", "not-a-port"),
            ("FOOTPRINT_REQUEST_TIMEOUT_SECS", "0"),
        ]));

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(
            config.request_timeout,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
    }
}
