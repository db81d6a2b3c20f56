//! Harness configuration.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `REGHARNESS_READY_TIMEOUT` | `30s` | Deadline for TCP/HTTP readiness waits (humantime syntax) |
//! | `REGHARNESS_POLL_INTERVAL` | `100ms` | Delay between readiness probes |
//! | `REGHARNESS_LISTEN_HOST` | `127.0.0.1` | Host for free-port discovery and TLS termination |

use std::time::Duration;

use crate::{Error, Result};

pub const ENV_READY_TIMEOUT: &str = "REGHARNESS_READY_TIMEOUT";
pub const ENV_POLL_INTERVAL: &str = "REGHARNESS_POLL_INTERVAL";
pub const ENV_LISTEN_HOST: &str = "REGHARNESS_LISTEN_HOST";

const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_LISTEN_HOST: &str = "127.0.0.1";

/// Timeouts and addresses used by the harness utilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// How long readiness helpers keep probing before giving up.
    pub ready_timeout: Duration,
    /// Delay between two readiness probes.
    pub poll_interval: Duration,
    /// Host the harness binds its own listeners on.
    pub listen_host: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            ready_timeout: DEFAULT_READY_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            listen_host: DEFAULT_LISTEN_HOST.to_string(),
        }
    }
}

impl HarnessConfig {
    /// Build a config from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from `lookup`, which maps variable names to values.
    /// Unset and empty variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get(ENV_READY_TIMEOUT) {
            config.ready_timeout = parse_duration(ENV_READY_TIMEOUT, &raw)?;
        }
        if let Some(raw) = get(ENV_POLL_INTERVAL) {
            config.poll_interval = parse_duration(ENV_POLL_INTERVAL, &raw)?;
        }
        if let Some(host) = get(ENV_LISTEN_HOST) {
            config.listen_host = host.trim().to_string();
        }
        Ok(config)
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_listen_host(mut self, host: impl Into<String>) -> Self {
        self.listen_host = host.into();
        self
    }
}

fn parse_duration(key: &str, raw: &str) -> Result<Duration> {
    humantime::parse_duration(raw.trim())
        .map_err(|e| Error::Config(format!("{key}={raw:?}: {e}")))
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
    fn defaults() {
        let config = HarnessConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.ready_timeout, Duration::from_secs(30));
        assert_eq!(config.listen_host, "127.0.0.1");
    }

    #[test]
    fn overrides() {
        let config = HarnessConfig::from_lookup(lookup(&[
            (ENV_READY_TIMEOUT, "2m 5s"),
            (ENV_POLL_INTERVAL, "10ms"),
            (ENV_LISTEN_HOST, "::1"),
        ]))
        .unwrap();
        assert_eq!(config.ready_timeout, Duration::from_secs(125));
        assert_eq!(config.poll_interval, Duration::from_millis(10));
        assert_eq!(config.listen_host, "::1");
    }

    #[test]
    fn empty_values_keep_defaults() {
        let config = HarnessConfig::from_lookup(lookup(&[(ENV_POLL_INTERVAL, " ")])).unwrap();
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn invalid_duration() {
        let err = HarnessConfig::from_lookup(lookup(&[(ENV_READY_TIMEOUT, "soon")])).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains(ENV_READY_TIMEOUT)), "{err}");
    }
}
