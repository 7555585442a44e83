//! Webhook error types.

use std::time::Duration;

use relay_core::SyncError;

/// Webhook errors.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// Invalid signature.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// Missing signature header.
    #[error("Missing signature header: {0}")]
    MissingSignature(String),

    /// Signature header present but unparseable.
    #[error("Malformed signature header: {0}")]
    MalformedSignatureHeader(String),

    /// Timestamp validation failed.
    #[error("Timestamp validation failed: {reason}")]
    TimestampValidation {
        /// Failure reason.
        reason: String,
        /// Actual timestamp.
        timestamp: Option<i64>,
        /// Current time.
        current_time: i64,
        /// Allowed tolerance.
        tolerance: Duration,
    },

    /// Payload too large.
    #[error("Payload too large: {size} bytes exceeds limit of {limit}")]
    PayloadTooLarge {
        /// Actual size.
        size: usize,
        /// Maximum allowed.
        limit: usize,
    },

    /// Invalid payload format.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Provider not configured.
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl WebhookError {
    /// Whether the delivery failed authentication.
    #[must_use]
    pub const fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature
                | Self::MissingSignature(_)
                | Self::MalformedSignatureHeader(_)
                | Self::TimestampValidation { .. }
        )
    }
}

impl From<WebhookError> for SyncError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::InvalidSignature
            | WebhookError::MissingSignature(_)
            | WebhookError::MalformedSignatureHeader(_)
            | WebhookError::TimestampValidation { .. } => Self::Authentication(err.to_string()),
            WebhookError::PayloadTooLarge { .. }
            | WebhookError::InvalidPayload(_)
            | WebhookError::JsonError(_) => Self::MalformedPayload(err.to_string()),
            WebhookError::ProviderNotConfigured(what) => Self::NotConfigured(what),
        }
    }
}

/// Result type for webhook operations.
pub type WebhookResult<T> = Result<T, WebhookError>;
