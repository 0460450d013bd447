//! Provider configuration.
//!
//! Endpoints, the provider key, timeouts and the history window are passed into
//! the pipeline at construction. Values come from the environment (and `.env`).

use std::time::Duration;

use crate::error::AppError;

use super::types::MAX_HISTORY_LIMIT;

pub const DEFAULT_REPORTS_URL: &str = "https://altos.re/api/v2/reports";
pub const DEFAULT_DATA_URL: &str = "https://altos.re/api/v2/data";
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_USER_AGENT: &str = "real_estate_app";

/// Bounded retry-with-backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. `1` disables retrying.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for every further attempt.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << shift)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocoderConfig {
    pub url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GEOCODER_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub reports_url: String,
    pub data_url: String,
    /// Sent as the `pai` query parameter.
    pub api_key: String,
    pub timeout: Duration,
    /// Number of weekly points requested in history mode.
    pub history_limit: u32,
    pub retry: RetryPolicy,
    pub geocoder: GeocoderConfig,
}

impl ProviderConfig {
    /// Defaults for everything except the provider key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            reports_url: DEFAULT_REPORTS_URL.to_string(),
            data_url: DEFAULT_DATA_URL.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
            history_limit: MAX_HISTORY_LIMIT,
            retry: RetryPolicy::default(),
            geocoder: GeocoderConfig::default(),
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the environment in production).
    pub fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let api_key = get("ALTOS_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::new(2, "Missing ALTOS_API_KEY in environment (.env)."))?;

        let mut config = Self::with_api_key(api_key.trim());

        if let Some(url) = get("ALTOS_REPORTS_URL") {
            config.reports_url = url;
        }
        if let Some(url) = get("ALTOS_DATA_URL") {
            config.data_url = url;
        }
        if let Some(secs) = parse_var::<u64>(&get, "ALTOS_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(limit) = parse_var::<u32>(&get, "ALTOS_HISTORY_LIMIT")? {
            config.history_limit = limit;
        }
        if let Some(attempts) = parse_var::<u32>(&get, "ALTOS_MAX_ATTEMPTS")? {
            config.retry.max_attempts = attempts.max(1);
        }
        if let Some(ms) = parse_var::<u64>(&get, "ALTOS_RETRY_BASE_MS")? {
            config.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(url) = get("GEOCODER_URL") {
            config.geocoder.url = url;
        }
        if let Some(agent) = get("GEOCODER_USER_AGENT") {
            config.geocoder.user_agent = agent;
        }
        if let Some(secs) = parse_var::<u64>(&get, "GEOCODER_TIMEOUT_SECS")? {
            config.geocoder.timeout = Duration::from_secs(secs.max(1));
        }

        config.history_limit = clamp_history_limit(config.history_limit);
        Ok(config)
    }
}

/// Keep the history window within `1..=MAX_HISTORY_LIMIT`.
pub fn clamp_history_limit(limit: u32) -> u32 {
    let clamped = limit.clamp(1, MAX_HISTORY_LIMIT);
    if clamped != limit {
        tracing::warn!(requested = limit, used = clamped, "history limit out of range");
    }
    clamped
}

fn parse_var<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, AppError> {
    match get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::new(2, format!("Invalid value for {key}: '{raw}'."))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let err = ProviderConfig::from_source(source(&[])).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = ProviderConfig::from_source(source(&[("ALTOS_API_KEY", "  ")])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let config = ProviderConfig::from_source(source(&[("ALTOS_API_KEY", "k1")])).unwrap();
        assert_eq!(config.api_key, "k1");
        assert_eq!(config.reports_url, DEFAULT_REPORTS_URL);
        assert_eq!(config.data_url, DEFAULT_DATA_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.history_limit, MAX_HISTORY_LIMIT);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.geocoder, GeocoderConfig::default());
    }

    #[test]
    fn overrides_are_read_and_history_is_clamped() {
        let config = ProviderConfig::from_source(source(&[
            ("ALTOS_API_KEY", "k1"),
            ("ALTOS_DATA_URL", "http://localhost:9/data"),
            ("ALTOS_TIMEOUT_SECS", "3"),
            ("ALTOS_HISTORY_LIMIT", "500"),
            ("ALTOS_MAX_ATTEMPTS", "0"),
            ("GEOCODER_TIMEOUT_SECS", "2"),
        ]))
        .unwrap();
        assert_eq!(config.data_url, "http://localhost:9/data");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.history_limit, MAX_HISTORY_LIMIT);
        assert_eq!(config.retry.max_attempts, 1);
        assert_eq!(config.geocoder.timeout, Duration::from_secs(2));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = ProviderConfig::from_source(source(&[
            ("ALTOS_API_KEY", "k1"),
            ("ALTOS_TIMEOUT_SECS", "ten"),
        ]))
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("ALTOS_TIMEOUT_SECS"));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    }
}
