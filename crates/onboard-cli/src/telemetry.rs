//! Subscriber setup for the binary

use anyhow::{anyhow, Result};
use onboard_core::LogConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` when set, the configured directive otherwise
///
/// # Errors
///
/// When the configured directive does not parse.
pub fn env_filter(config: &LogConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| anyhow!("invalid log filter '{}': {e}", config.filter)),
    }
}

/// Install the global subscriber, plain or JSON lines on stderr
///
/// # Errors
///
/// When the filter is invalid or a subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);
    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }
    Ok(())
}
