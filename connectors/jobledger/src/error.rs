//! Job ledger error types.

use relay_core::AdapterError;
use serde_json::Value;
use thiserror::Error;

use crate::SYSTEM_NAME;

/// Job ledger errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Request never got a usable answer. The URL is stripped on conversion
    /// so the query-string token cannot leak into messages.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// Ledger answered with a non-success status.
    #[error("Ledger API error {status}: {message}")]
    Api {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    /// Ledger answered 2xx but reported `success: false`.
    #[error("Ledger rejected request: {message}")]
    Rejected { message: String, body: Value },

    /// Response body did not match the expected shape.
    #[error("Unexpected ledger response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Base URL unusable.
    #[error("Invalid ledger URL: {0}")]
    Url(String),
}

impl LedgerError {
    /// Check if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            Self::Rejected { .. } | Self::Decode(_) | Self::Url(_) => false,
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
            } => {
                let err = AdapterError::application(SYSTEM_NAME, Some(status), message);
                match body {
                    Some(body) => err.with_raw(body),
                    None => err,
                }
            }
            Self::Rejected { message, body } => {
                AdapterError::application(SYSTEM_NAME, None, message).with_raw(body)
            }
            Self::Decode(err) => AdapterError::application(SYSTEM_NAME, None, err.to_string()),
            Self::Url(message) => AdapterError::application(SYSTEM_NAME, None, message),
        }
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.without_url())
    }
}

/// Result type for job ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
