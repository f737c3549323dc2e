//! # Logging Module
//!
//! Installs the global `tracing` subscriber. The filter comes from `RUST_LOG`
//! (default `ingredient_scaler=info`); `LOG_FORMAT=json` switches from compact
//! text to JSON lines.

use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "ingredient_scaler=info";

/// Output format of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    /// Interpret a `LOG_FORMAT` value; anything but "json" means compact
    pub fn from_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }

    pub fn from_env() -> Self {
        Self::from_value(env::var("LOG_FORMAT").ok().as_deref())
    }
}

/// Initialize logging for the binary
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    let result = match LogFormat::from_env() {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().with_target(false).json())
            .try_init(),
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().with_target(false).compact())
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_value() {
        assert_eq!(LogFormat::from_value(Some("json")), LogFormat::Json);
        assert_eq!(LogFormat::from_value(Some(" JSON ")), LogFormat::Json);
        assert_eq!(LogFormat::from_value(Some("pretty")), LogFormat::Compact);
        assert_eq!(LogFormat::from_value(None), LogFormat::Compact);
    }

    #[test]
    fn test_init_logging_twice_does_not_panic() {
        init_logging();
        init_logging();
    }
}
