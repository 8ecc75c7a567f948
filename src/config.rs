//! # Import Configuration
//!
//! Importer settings loaded from environment variables.

use crate::constants::*;
use crate::poller::PollSettings;
use std::time::Duration;
use tracing::warn;

/// Importer configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportConfig {
    /// Interval between access-token binding polls (milliseconds)
    pub binding_poll_interval_ms: u64,
    /// How long to wait for binding injection (seconds)
    pub binding_timeout_secs: u64,
    /// Interval between detection query polls (milliseconds)
    pub detection_poll_interval_ms: u64,
    /// How long to wait for component detection (seconds)
    pub detection_timeout_secs: u64,
    /// Random extra delay added to each poll, as a percentage of the interval
    pub poll_jitter_percent: u8,
    /// Field manager recorded on created and updated resources
    pub field_manager: String,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            binding_poll_interval_ms: DEFAULT_BINDING_POLL_INTERVAL_MS,
            binding_timeout_secs: DEFAULT_BINDING_TIMEOUT_SECS,
            detection_poll_interval_ms: DEFAULT_DETECTION_POLL_INTERVAL_MS,
            detection_timeout_secs: DEFAULT_DETECTION_TIMEOUT_SECS,
            poll_jitter_percent: DEFAULT_POLL_JITTER_PERCENT,
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            log_level: "INFO".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl ImportConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            binding_poll_interval_ms: parsed_or_default(
                &lookup,
                "BINDING_POLL_INTERVAL_MS",
                defaults.binding_poll_interval_ms,
            ),
            binding_timeout_secs: parsed_or_default(
                &lookup,
                "BINDING_TIMEOUT_SECS",
                defaults.binding_timeout_secs,
            ),
            detection_poll_interval_ms: parsed_or_default(
                &lookup,
                "DETECTION_POLL_INTERVAL_MS",
                defaults.detection_poll_interval_ms,
            ),
            detection_timeout_secs: parsed_or_default(
                &lookup,
                "DETECTION_TIMEOUT_SECS",
                defaults.detection_timeout_secs,
            ),
            poll_jitter_percent: parsed_within(
                &lookup,
                "POLL_JITTER_PERCENT",
                defaults.poll_jitter_percent,
                |percent| *percent <= 100,
            ),
            field_manager: lookup("FIELD_MANAGER").unwrap_or(defaults.field_manager),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT").unwrap_or(defaults.log_format),
        }
    }

    fn jitter(&self) -> f64 {
        f64::from(self.poll_jitter_percent) / 100.0
    }

    /// Poll settings for waiting on binding injection
    #[must_use]
    pub fn binding_poll(&self) -> PollSettings {
        PollSettings::new(
            Duration::from_millis(self.binding_poll_interval_ms),
            Duration::from_secs(self.binding_timeout_secs),
        )
        .with_jitter(self.jitter())
    }

    /// Poll settings for waiting on component detection
    #[must_use]
    pub fn detection_poll(&self) -> PollSettings {
        PollSettings::new(
            Duration::from_millis(self.detection_poll_interval_ms),
            Duration::from_secs(self.detection_timeout_secs),
        )
        .with_jitter(self.jitter())
    }
}

/// Read and parse a value, falling back to `default` when unset or unparsable
fn parsed_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Debug,
{
    parsed_within(lookup, key, default, |_| true)
}

/// Like [`parsed_or_default`], also falling back when `valid` rejects the value
fn parsed_within<F, T, V>(lookup: &F, key: &str, default: T, valid: V) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Debug,
    V: Fn(&T) -> bool,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            warn!(
                key,
                value = %raw,
                default = ?default,
                "invalid configuration value, using default"
            );
            default
        }
    }
}
