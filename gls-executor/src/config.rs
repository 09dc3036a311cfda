//! Monitor configuration
//!
//! Timing and rate-limiting parameters of the polling monitor. These are
//! process settings, separate from the per-run [`RunSettings`](crate::settings::RunSettings).

use std::time::Duration;

/// Polling monitor configuration
///
/// The loop wakes every `poll_tick` to pick up new handles and react to
/// shutdown, but each handle's remote status is queried at most once per
/// `min_poll_spacing`.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// How often the monitor loop wakes up
    pub poll_tick: Duration,

    /// Minimum time between two remote requests for the same handle
    pub min_poll_spacing: Duration,

    /// Consecutive passes without reaching the remote service before giving up
    pub max_consecutive_failures: u32,

    /// Maximum number of remote requests in flight during one pass
    pub max_concurrent_requests: usize,

    /// Upper bound on each best-effort cancel request during shutdown
    pub cancel_timeout: Duration,

    /// Upper bound on one submit or poll request; an expired request counts as transient
    pub request_timeout: Duration,
}

impl MonitorConfig {
    /// Creates a new configuration with defaults
    pub fn new() -> Self {
        Self {
            poll_tick: Duration::from_secs(1),
            min_poll_spacing: Duration::from_secs(10),
            max_consecutive_failures: 10,
            max_concurrent_requests: 8,
            cancel_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - GLS_POLL_TICK_MS (default: 1000)
    /// - GLS_MIN_POLL_SPACING_SECS (default: 10)
    /// - GLS_MAX_POLL_FAILURES (default: 10)
    /// - GLS_MAX_CONCURRENT_REQUESTS (default: 8)
    /// - GLS_CANCEL_TIMEOUT_SECS (default: 5)
    /// - GLS_REQUEST_TIMEOUT_SECS (default: 30)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::new();

        let poll_tick = env_parse::<u64>("GLS_POLL_TICK_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_tick);

        let min_poll_spacing = env_parse::<u64>("GLS_MIN_POLL_SPACING_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.min_poll_spacing);

        let max_consecutive_failures = env_parse::<u32>("GLS_MAX_POLL_FAILURES")?
            .unwrap_or(defaults.max_consecutive_failures);

        let max_concurrent_requests = env_parse::<usize>("GLS_MAX_CONCURRENT_REQUESTS")?
            .unwrap_or(defaults.max_concurrent_requests);

        let cancel_timeout = env_parse::<u64>("GLS_CANCEL_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.cancel_timeout);

        let request_timeout = env_parse::<u64>("GLS_REQUEST_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        Ok(Self {
            poll_tick,
            min_poll_spacing,
            max_consecutive_failures,
            max_concurrent_requests,
            cancel_timeout,
            request_timeout,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_tick.is_zero() {
            anyhow::bail!("poll_tick must be greater than 0");
        }

        if self.min_poll_spacing < self.poll_tick {
            anyhow::bail!("min_poll_spacing must not be shorter than poll_tick");
        }

        if self.max_consecutive_failures == 0 {
            anyhow::bail!("max_consecutive_failures must be greater than 0");
        }

        if self.max_concurrent_requests == 0 {
            anyhow::bail!("max_concurrent_requests must be greater than 0");
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> anyhow::Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{} is not a valid number: {}", name, raw)),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.poll_tick, Duration::from_secs(1));
        assert_eq!(config.min_poll_spacing, Duration::from_secs(10));
        assert_eq!(config.max_consecutive_failures, 10);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = MonitorConfig::default();

        config.poll_tick = Duration::ZERO;
        assert!(config.validate().is_err());

        config.poll_tick = Duration::from_secs(20);
        assert!(config.validate().is_err());

        config.poll_tick = Duration::from_secs(1);
        config.max_consecutive_failures = 0;
        assert!(config.validate().is_err());

        config.max_consecutive_failures = 3;
        config.max_concurrent_requests = 0;
        assert!(config.validate().is_err());

        config.max_concurrent_requests = 1;
        config.request_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        config.request_timeout = Duration::from_secs(30);
        assert!(config.validate().is_ok());
    }
}
