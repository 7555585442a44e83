//! Payments error types.

use relay_core::AdapterError;
use serde_json::Value;
use thiserror::Error;

use crate::SYSTEM_NAME;

/// Payments errors.
#[derive(Error, Debug)]
pub enum PaymentsError {
    /// Request never got a usable answer.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// Processor answered with an error envelope.
    #[error("Payments API error {status}: {message}")]
    Api {
        status: u16,
        message: String,
        error_type: Option<String>,
        body: Option<Value>,
    },

    /// Response body did not match the expected shape.
    #[error("Unexpected payments response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Base URL unusable.
    #[error("Invalid payments URL: {0}")]
    Url(String),
}

impl PaymentsError {
    /// Check if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api {
                status, error_type, ..
            } => *status >= 500 || *status == 429 || error_type.as_deref() == Some("api_error"),
            Self::Decode(_) | Self::Url(_) => false,
        }
    }

    /// Convert to the relay's adapter error.
    #[must_use]
    pub fn into_adapter_error(self) -> AdapterError {
        match self {
            Self::Http(err) => AdapterError::Transport {
                system: SYSTEM_NAME,
                timed_out: err.is_timeout(),
                message: err.to_string(),
            },
            Self::Api {
                status,
                message,
                body,
                ..
            } => {
                let err = AdapterError::application(SYSTEM_NAME, Some(status), message);
                match body {
                    Some(body) => err.with_raw(body),
                    None => err,
                }
            }
            Self::Decode(err) => AdapterError::application(SYSTEM_NAME, None, err.to_string()),
            Self::Url(message) => AdapterError::application(SYSTEM_NAME, None, message),
        }
    }
}

impl From<reqwest::Error> for PaymentsError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.without_url())
    }
}

/// Result type for payments operations.
pub type PaymentsResult<T> = Result<T, PaymentsError>;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_error_is_retryable() {
        let api = |status: u16, error_type: &str| PaymentsError::Api {
            status,
            message: "failed".into(),
            error_type: Some(error_type.into()),
            body: None,
        };

        assert!(api(500, "api_error").is_retryable());
        assert!(api(429, "rate_limit_error").is_retryable());
        assert!(!api(400, "invalid_request_error").is_retryable());
        assert!(!api(401, "authentication_error").is_retryable());
    }

    #[test]
    fn test_api_error_keeps_envelope() {
        let body = json!({"error": {"message": "No such payment_intent", "type": "invalid_request_error"}});
        let err = PaymentsError::Api {
            status: 400,
            message: "No such payment_intent".into(),
            error_type: Some("invalid_request_error".into()),
            body: Some(body.clone()),
        }
        .into_adapter_error();

        assert!(!err.is_transport());
        assert_eq!(err.system(), "payments");
        assert_eq!(err.diagnostic(), body);
    }

    #[test]
    fn test_bad_base_url_is_not_transport() {
        let local = PaymentsError::Url("invalid base URL: relative URL without a base".into());
        assert!(!local.is_retryable());

        let err = local.into_adapter_error();
        assert!(!err.is_transport());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("invalid base URL"));
    }
}
