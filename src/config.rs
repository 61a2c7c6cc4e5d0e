//! Client configuration loaded from environment variables.
//!
//! - `TRACKING_API_BASE_URL` - backend root (default: `http://127.0.0.1:8000`)
//! - `TRACKING_CACHE_DIR` - directory holding the cache snapshots (default: `data/cache`)
//! - `TRACKING_REFRESH_SECS` - dashboard refresh period (default: 30)
//! - `TRACKING_REQUEST_TIMEOUT_SECS` - per-request timeout (default: 10)
//! - `TRACKING_CSRF_COOKIE` - raw `Cookie` header searched for `csrftoken`
//! - `TRACKING_CSRF_TOKEN` - token used when the cookie has none

use std::{env, path::PathBuf, time::Duration};
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_CACHE_DIR: &str = "data/cache";
const DEFAULT_REFRESH_SECS: u64 = 30;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {0}: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub cache_dir: PathBuf,
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
    pub csrf_cookie: Option<String>,
    pub csrf_token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            csrf_cookie: None,
            csrf_token: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let seconds = |key: &'static str, fallback: Duration| -> Result<Duration, ConfigError> {
            match non_empty(key) {
                None => Ok(fallback),
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(0) => Err(ConfigError::Invalid(key, "must be greater than zero".into())),
                    Ok(secs) => Ok(Duration::from_secs(secs)),
                    Err(err) => Err(ConfigError::Invalid(key, format!("{raw:?}: {err}"))),
                },
            }
        };

        let config = Self {
            api_base_url: non_empty("TRACKING_API_BASE_URL").unwrap_or(defaults.api_base_url),
            cache_dir: non_empty("TRACKING_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            refresh_interval: seconds("TRACKING_REFRESH_SECS", defaults.refresh_interval)?,
            request_timeout: seconds("TRACKING_REQUEST_TIMEOUT_SECS", defaults.request_timeout)?,
            csrf_cookie: non_empty("TRACKING_CSRF_COOKIE"),
            csrf_token: non_empty("TRACKING_CSRF_TOKEN"),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "TRACKING_REFRESH_SECS",
                "must be greater than zero".into(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "TRACKING_REQUEST_TIMEOUT_SECS",
                "must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_base_url, "http://127.0.0.1:8000");
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
        assert!(config.csrf_cookie.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("TRACKING_API_BASE_URL", "https://garage.example"),
            ("TRACKING_REFRESH_SECS", "5"),
            ("TRACKING_CSRF_TOKEN", "abc"),
            ("TRACKING_CACHE_DIR", "  "),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "https://garage.example");
        assert_eq!(config.refresh_interval, Duration::from_secs(5));
        assert_eq!(config.csrf_token.as_deref(), Some("abc"));
        assert_eq!(config.cache_dir, PathBuf::from("data/cache"));
    }

    #[test]
    fn validate_rejects_zero_durations() {
        let config = ClientConfig {
            refresh_interval: Duration::ZERO,
            ..ClientConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid("TRACKING_REFRESH_SECS", _))
        ));
        let config = ClientConfig {
            request_timeout: Duration::ZERO,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_intervals() {
        assert!(ClientConfig::from_lookup(lookup(&[("TRACKING_REFRESH_SECS", "0")])).is_err());
        let timeout = lookup(&[("TRACKING_REQUEST_TIMEOUT_SECS", "soon")]);
        assert!(ClientConfig::from_lookup(timeout).is_err());
    }
}
