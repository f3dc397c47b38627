//! Tracing/logging setup shared by binaries and tests.

pub mod config;

/// Subscriber installation.
pub mod tracing;

pub use config::{ConfigError, LogFormat, ObservabilityConfig};

/// Initialize process-wide logging from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops. An unreadable
/// `KEEL_LOG_FORMAT` falls back to the default format.
pub fn init() {
    let config = ObservabilityConfig::from_env().unwrap_or_default();
    tracing::init_with(&config);
}

/// Initialize process-wide logging from an explicit configuration.
pub fn init_with(config: &ObservabilityConfig) {
    tracing::init_with(config);
}
