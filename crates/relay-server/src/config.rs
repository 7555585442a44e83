//! Server configuration.
//!
//! Loaded from a TOML file in which every table and field is optional.
//! Secrets may come from the file but are normally supplied through the
//! environment (see `main.rs`).

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use relay_core::{DEFAULT_IDEMPOTENCY_TTL, Secret};
use relay_jobledger::LedgerConfig;
use relay_payments::PaymentsConfig;
use relay_projectboard::BoardConfig;
use relay_sync::{Credentials, DEFAULT_CALL_TIMEOUT, FieldMapping};
use relay_telemetry::TelemetryConfig;
use relay_webhook::{DEFAULT_MAX_PAYLOAD_SIZE, DEFAULT_TIMESTAMP_TOLERANCE, RouterConfig};
use serde::Deserialize;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// An adapter could not be built.
    #[error("failed to build {system} adapter: {message}")]
    Adapter {
        system: &'static str,
        message: String,
    },
}

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub logging: TelemetryConfig,
    pub webhook: WebhookConfig,
    pub sync: SyncConfig,
    pub secrets: WebhookSecrets,
    pub credentials: Credentials,
    pub payments: PaymentsConfig,
    pub board: BoardConfig,
    pub ledger: LedgerConfig,
}

/// Listener and HTTP limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Whole-request deadline; `503` once exceeded.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    /// Largest webhook body accepted, in bytes.
    pub max_payload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            request_timeout: Duration::from_secs(30),
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

/// Inbound verification and classification.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Replay window for payment signatures.
    #[serde(with = "duration_secs")]
    pub timestamp_tolerance: Duration,
    /// Board column synced as the outgoing date.
    pub date_column: String,
    /// Accept unsigned board events when no board secret is set.
    pub allow_unsigned_board_events: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timestamp_tolerance: DEFAULT_TIMESTAMP_TOLERANCE,
            date_column: "date".to_string(),
            allow_unsigned_board_events: false,
        }
    }
}

/// Orchestration settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Deadline per adapter call.
    #[serde(with = "duration_secs")]
    pub call_timeout: Duration,
    /// Lifetime of in-memory idempotency markers.
    #[serde(with = "duration_secs")]
    pub idempotency_ttl: Duration,
    pub fields: FieldMapping,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            idempotency_ttl: DEFAULT_IDEMPOTENCY_TTL,
            fields: FieldMapping::default(),
        }
    }
}

/// Secrets for the inbound channels and reference tokens.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebhookSecrets {
    pub payments_webhook_secret: Secret,
    pub board_webhook_secret: Secret,
    pub token_secret: Secret,
}

impl RelayConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Unreadable file or invalid TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Invalid TOML or a field of the wrong type.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Reject values the relay cannot run with.
    ///
    /// Missing secrets are not rejected here; see [`Self::missing_secrets`].
    ///
    /// # Errors
    ///
    /// The first out-of-range value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_payload_size == 0 {
            return Err(ConfigError::Invalid("server.max_payload_size must be positive".into()));
        }
        if self.server.request_timeout.is_zero() {
            return Err(ConfigError::Invalid("server.request_timeout must be positive".into()));
        }
        if self.sync.call_timeout.is_zero() {
            return Err(ConfigError::Invalid("sync.call_timeout must be positive".into()));
        }
        if self.webhook.date_column.trim().is_empty() {
            return Err(ConfigError::Invalid("webhook.date_column must not be empty".into()));
        }
        if self.sync.fields.outgoing_date.trim().is_empty() || self.sync.fields.amount_paid.trim().is_empty() {
            return Err(ConfigError::Invalid("sync.fields entries must not be empty".into()));
        }
        Ok(())
    }

    /// Secrets that are absent. The affected channel answers `500`
    /// "not configured" until they are supplied.
    #[must_use]
    pub fn missing_secrets(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.secrets.payments_webhook_secret.is_empty() {
            missing.push("PAYMENTS_WEBHOOK_SECRET");
        }
        if self.secrets.token_secret.is_empty() {
            missing.push("TOKEN_SECRET");
        }
        if self.secrets.board_webhook_secret.is_empty() && !self.webhook.allow_unsigned_board_events {
            missing.push("BOARD_WEBHOOK_SECRET");
        }
        if self.credentials.payments_api_key.is_empty() {
            missing.push("PAYMENTS_API_KEY");
        }
        if self.credentials.board_api_token.is_empty() {
            missing.push("BOARD_API_TOKEN");
        }
        if self.credentials.ledger_api_token.is_empty() {
            missing.push("LEDGER_API_TOKEN");
        }
        missing
    }

    /// Router settings derived from this configuration.
    #[must_use]
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            max_payload_size: self.server.max_payload_size,
            timestamp_tolerance: self.webhook.timestamp_tolerance,
            date_column: self.webhook.date_column.clone(),
            allow_unsigned_board_events: self.webhook.allow_unsigned_board_events,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
