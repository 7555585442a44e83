//! Relay Telemetry - structured logging for the webhook relay
//!
//! - **Structured Logging**: JSON or pretty output through `tracing-subscriber`
//! - **Filtering**: `RUST_LOG` overrides the configured level
//! - **Redaction**: credential-looking keys scrubbed before JSON is logged
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use relay_telemetry::{TelemetryConfig, init_telemetry};
//!
//! init_telemetry(&TelemetryConfig::new("relay-server"))?;
//! tracing::info!(channel = "payments", "Webhook accepted");
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod logging;

pub use logging::*;

use serde::Deserialize;

/// Configuration for telemetry initialization.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name attached to the startup line.
    pub service_name: String,

    /// Log level filter (e.g., "info", "debug", "relay_sync=trace").
    pub log_level: String,

    /// Enable JSON log output.
    pub json_logs: bool,

    /// Keys whose values are replaced before JSON is logged.
    pub redact_fields: Vec<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "relay-server".to_string(),
            log_level: "info".to_string(),
            json_logs: true,
            redact_fields: default_redact_fields(),
        }
    }
}

impl TelemetryConfig {
    /// Create a new configuration with the given service name.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set the log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable or disable JSON logs.
    #[must_use]
    pub const fn with_json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }

    /// Add fields to redact from logs.
    #[must_use]
    pub fn with_redact_fields(mut self, fields: Vec<String>) -> Self {
        self.redact_fields.extend(fields);
        self
    }
}

fn default_redact_fields() -> Vec<String> {
    ["password", "api_key", "secret", "token", "authorization"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Initialize the telemetry system.
///
/// Call once at startup; a second call fails because a global subscriber
/// is already installed.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already set.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    init_logging(config)?;
    tracing::info!(
        service = %config.service_name,
        json = config.json_logs,
        "Telemetry initialized"
    );
    Ok(())
}

/// Telemetry error type.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();

        assert_eq!(config.service_name, "relay-server");
        assert_eq!(config.log_level, "info");
        assert!(config.json_logs);
        assert!(config.redact_fields.contains(&"authorization".to_string()));
    }

    #[test]
    fn test_telemetry_config_builder_chain() {
        let config = TelemetryConfig::new("relay-test")
            .with_log_level("debug")
            .with_json_logs(false)
            .with_redact_fields(vec!["webhook_secret".to_string()]);

        assert_eq!(config.service_name, "relay-test");
        assert_eq!(config.log_level, "debug");
        assert!(!config.json_logs);
        assert!(config.redact_fields.contains(&"webhook_secret".to_string()));
        assert!(config.redact_fields.contains(&"password".to_string()));
    }

    #[test]
    fn test_telemetry_config_partial_deserialize() {
        let config: TelemetryConfig =
            serde_json::from_value(serde_json::json!({"json_logs": false})).unwrap();

        assert!(!config.json_logs);
        assert_eq!(config.log_level, "info");
        assert!(!config.redact_fields.is_empty());
    }

    #[test]
    fn test_telemetry_error_display() {
        let error = TelemetryError::Config("bad filter".to_string());
        assert!(error.to_string().contains("bad filter"));
    }
}
