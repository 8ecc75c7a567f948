//! # Observability
//!
//! Tracing subscriber setup for the CLI driver.
//!
//! `RUST_LOG` takes precedence; otherwise the configured `LOG_LEVEL` applies
//! to this crate only. `LOG_FORMAT=json` switches to one JSON object per line.

use crate::config::ImportConfig;
use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
#[must_use]
pub fn default_filter(config: &ImportConfig) -> String {
    format!("appstudio_import={}", config.log_level.to_lowercase())
}

/// Install the global tracing subscriber
pub fn init_tracing(config: &ImportConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(config)));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if config.log_format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}
