//! Structured logging with JSON output and sensitive data redaction.

use serde_json::Value;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

use crate::{TelemetryConfig, TelemetryError};

/// Replacement for redacted values.
pub const REDACTED: &str = "[REDACTED]";

/// Initialize the logging subsystem.
pub(crate) fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| TelemetryError::Config(format!("log_level {:?}: {e}", config.log_level)))?,
    };

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config.json_logs {
        let json_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE);

        subscriber
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let pretty_layer = fmt::layer()
            .with_ansi(true)
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE);

        subscriber
            .with(pretty_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    Ok(())
}

/// Redact sensitive fields from a JSON value.
///
/// Keys match case-insensitively by substring, so `access_token` is caught
/// by `token`.
#[must_use]
pub fn redact_sensitive(value: &Value, fields: &[String]) -> Value {
    match value {
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (key, val) in map {
                let key_lower = key.to_lowercase();
                if fields.iter().any(|f| key_lower.contains(&f.to_lowercase())) {
                    result.insert(key.clone(), Value::String(REDACTED.to_string()));
                } else {
                    result.insert(key.clone(), redact_sensitive(val, fields));
                }
            }
            Value::Object(result)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_sensitive(v, fields)).collect()),
        other => other.clone(),
    }
}

/// Log the answer given to a webhook sender.
///
/// Bodies are redacted with `fields` first. Server-side failures log at
/// `warn`, everything else at `info`.
pub fn log_webhook_response(channel: &str, status: u16, body: &Value, duration_ms: u64, fields: &[String]) {
    let redacted = redact_sensitive(body, fields);

    if status >= 500 {
        tracing::warn!(
            channel,
            status,
            response = %redacted,
            duration_ms,
            "Webhook failed"
        );
    } else {
        tracing::info!(
            channel,
            status,
            response = %redacted,
            duration_ms,
            "Webhook handled"
        );
    }
}
