//! Log subscriber setup for the probe binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use warden_core::{TelemetryConfig, WardenError, WardenResult};

/// Install the global subscriber.
///
/// Logs go to stderr so stdout carries only the probe result.
pub fn init_tracing(config: &TelemetryConfig) -> WardenResult<()> {
    let env_filter = EnvFilter::try_new(&config.filter).map_err(|e| WardenError::Telemetry {
        reason: format!("invalid log filter '{}': {}", config.filter, e),
    })?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    result.map_err(|e| WardenError::Telemetry {
        reason: format!("failed to init subscriber: {}", e),
    })?;

    tracing::debug!(filter = %config.filter, json = config.json, "Telemetry initialized");
    Ok(())
}
