//! FX service configuration.

use std::str::FromStr;

use chrono::Duration;
use pesopro_common::time::constants;
use pesopro_common::{validate_rate, FALLBACK_USD_MXN};

use crate::error::{FxError, FxResult};

/// When the service goes to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Fetch only when the cached value is absent or stale.
    #[default]
    WhenStale,
    /// Serve the cache immediately but always revalidate.
    Always,
}

impl FromStr for RefreshPolicy {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "when-stale" | "when_stale" | "stale" => Ok(RefreshPolicy::WhenStale),
            "always" => Ok(RefreshPolicy::Always),
            other => Err(FxError::Configuration(format!(
                "Unknown refresh policy: {}",
                other
            ))),
        }
    }
}

/// Configuration for the FX service.
#[derive(Debug, Clone)]
pub struct FxServiceConfig {
    /// Freshness window of the current rate.
    pub rate_freshness: Duration,
    /// Freshness window of the history series.
    pub history_freshness: Duration,
    /// Days the history window reaches back from today.
    pub history_days: i64,
    /// Rate served when nothing was ever fetched.
    pub fallback_rate: f64,
    /// Refresh policy.
    pub refresh_policy: RefreshPolicy,
    /// Keep showing the stale cached series when a history refresh fails.
    /// Off by default: a failed refresh yields an empty series.
    pub serve_stale_history: bool,
}

impl Default for FxServiceConfig {
    fn default() -> Self {
        Self {
            rate_freshness: constants::rate_freshness_window(),
            history_freshness: constants::history_freshness_window(),
            history_days: constants::HISTORY_DAYS,
            fallback_rate: FALLBACK_USD_MXN,
            refresh_policy: RefreshPolicy::WhenStale,
            serve_stale_history: false,
        }
    }
}

impl FxServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> FxResult<Self> {
        let mut config = Self::default();

        if let Ok(minutes) = std::env::var("PESOPRO_RATE_TTL_MINUTES") {
            config.rate_freshness = parse_minutes("PESOPRO_RATE_TTL_MINUTES", &minutes)?;
        }

        if let Ok(minutes) = std::env::var("PESOPRO_HISTORY_TTL_MINUTES") {
            config.history_freshness = parse_minutes("PESOPRO_HISTORY_TTL_MINUTES", &minutes)?;
        }

        if let Ok(rate) = std::env::var("PESOPRO_FALLBACK_RATE") {
            config.fallback_rate = parse_env("PESOPRO_FALLBACK_RATE", &rate)?;
        }

        if let Ok(policy) = std::env::var("PESOPRO_REFRESH_POLICY") {
            config.refresh_policy = policy.parse()?;
        }

        if let Ok(flag) = std::env::var("PESOPRO_SERVE_STALE_HISTORY") {
            config.serve_stale_history = parse_env("PESOPRO_SERVE_STALE_HISTORY", &flag)?;
        }

        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> FxResult<()> {
        if self.rate_freshness <= Duration::zero() {
            return Err(FxError::Configuration(
                "Rate freshness window must be positive".to_string(),
            ));
        }

        if self.history_freshness <= Duration::zero() {
            return Err(FxError::Configuration(
                "History freshness window must be positive".to_string(),
            ));
        }

        if self.history_days < 1 {
            return Err(FxError::Configuration(
                "History must cover at least one day".to_string(),
            ));
        }

        validate_rate(self.fallback_rate).map_err(|e| {
            FxError::Configuration(format!("Fallback rate rejected: {}", e))
        })?;

        Ok(())
    }
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> FxResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| FxError::Configuration(format!("{} has invalid value '{}'", name, value)))
}

/// Minutes as a duration; values chrono cannot represent are rejected.
fn parse_minutes(name: &str, value: &str) -> FxResult<Duration> {
    Duration::try_minutes(parse_env(name, value)?).ok_or_else(|| {
        FxError::Configuration(format!("{} is out of range: '{}'", name, value))
    })
}
