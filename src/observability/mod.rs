//! # Observability
//!
//! Structured logging setup for embedders using the tracing ecosystem. The
//! manager itself only emits `tracing` events; installing a subscriber is
//! the host process's choice, made here once at startup.

use tracing_subscriber::EnvFilter;

use crate::errors::{Result, TrustplaneError};

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Text,
    /// JSON output for log aggregation systems.
    Json,
}

/// Install a global tracing subscriber filtered by `RUST_LOG`, defaulting
/// to `info`. Fails if a subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| TrustplaneError::internal(format!("tracing init failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_installs_once() {
        // First call may succeed or fail depending on test ordering; the
        // second must fail because a subscriber is already installed.
        let _ = init_tracing(LogFormat::Text);
        assert!(init_tracing(LogFormat::Text).is_err());
    }
}
