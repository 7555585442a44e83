//! Relay error taxonomy and its HTTP mapping.
//!
//! Error kinds:
//! - `authentication_failure`: signature or token mismatch (400)
//! - `malformed_payload`: body unparseable or missing fields (400)
//! - `reference_resolution_failure`: lookup found nothing (400) or failed (500)
//! - `lock_check_failure`: lock state could not be read (500)
//! - `external_write_failure`: the authoritative write failed (500)
//! - `not_configured`: a required secret is missing (500)
//! - `idempotency_store_failure`: marker store unreachable (500)
//! - `internal_error`: anything else (500)
//!
//! A locked record is not an error; it is a [`crate::SyncOutcome`].

use std::fmt;

use serde_json::{Value, json};
use thiserror::Error;

use crate::{AdapterError, StoreError};

/// Why a cross-system reference could not be resolved.
#[derive(Debug, Clone)]
pub enum ResolutionCause {
    /// The remote system answered and has no matching record.
    NotFound { system: &'static str },
    /// The lookup itself failed.
    Lookup(AdapterError),
}

impl fmt::Display for ResolutionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { system } => write!(f, "no matching record in {system}"),
            Self::Lookup(err) => write!(f, "lookup failed: {err}"),
        }
    }
}

/// Terminal failure of one webhook invocation.
#[derive(Error, Debug)]
pub enum SyncError {
    // ─────────────────────────────────────────────────────────────────────────
    // Caller errors (400)
    // ─────────────────────────────────────────────────────────────────────────
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("reference {reference} could not be resolved: {cause}")]
    ReferenceResolution {
        reference: String,
        cause: ResolutionCause,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Downstream errors (500)
    // ─────────────────────────────────────────────────────────────────────────
    #[error("lock state of {reference} could not be read: {error}")]
    LockCheck {
        reference: String,
        error: AdapterError,
    },

    #[error("write to {reference} failed: {error}")]
    ExternalWrite {
        reference: String,
        error: AdapterError,
    },

    #[error(transparent)]
    Idempotency(#[from] StoreError),

    // ─────────────────────────────────────────────────────────────────────────
    // Deployment / internal errors (500)
    // ─────────────────────────────────────────────────────────────────────────
    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Authentication(_) | Self::MalformedPayload(_) => 400,
            Self::ReferenceResolution {
                cause: ResolutionCause::NotFound { .. },
                ..
            } => 400,
            Self::ReferenceResolution {
                cause: ResolutionCause::Lookup(_),
                ..
            }
            | Self::LockCheck { .. }
            | Self::ExternalWrite { .. }
            | Self::Idempotency(_)
            | Self::NotConfigured(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Stable snake_case tag surfaced as `kind` in response bodies.
    #[must_use]
    pub const fn error_kind(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "authentication_failure",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::ReferenceResolution { .. } => "reference_resolution_failure",
            Self::LockCheck { .. } => "lock_check_failure",
            Self::ExternalWrite { .. } => "external_write_failure",
            Self::Idempotency(_) => "idempotency_store_failure",
            Self::NotConfigured(_) => "not_configured",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Diagnostic detail for the response body.
    ///
    /// Adapter errors are built without credentials, so their payloads are
    /// safe to surface.
    #[must_use]
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::ReferenceResolution { reference, cause } => Some(match cause {
                ResolutionCause::NotFound { system } => json!({
                    "reference": reference,
                    "system": system,
                    "found": false,
                }),
                ResolutionCause::Lookup(err) => json!({
                    "reference": reference,
                    "system": err.system(),
                    "transport": err.is_transport(),
                    "remote": err.diagnostic(),
                }),
            }),
            Self::LockCheck { reference, error } | Self::ExternalWrite { reference, error } => {
                Some(json!({
                    "reference": reference,
                    "system": error.system(),
                    "transport": error.is_transport(),
                    "remote": error.diagnostic(),
                }))
            }
            _ => None,
        }
    }

    /// Whether this error came from a downstream transport failure.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        match self {
            Self::ReferenceResolution {
                cause: ResolutionCause::Lookup(error),
                ..
            }
            | Self::LockCheck { error, .. }
            | Self::ExternalWrite { error, .. } => error.is_transport(),
            _ => false,
        }
    }
}

/// Result type for relay operations.
pub type SyncResult<T> = Result<T, SyncError>;
