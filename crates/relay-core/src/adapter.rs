//! Record-system adapter seam.
//!
//! Every downstream system (payments, project board, job ledger) is reached
//! through [`RecordSystem`]. Credentials travel as an explicit parameter on
//! every call so orchestration can run against fakes.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::Secret;

/// Writability of a target record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    /// Record is frozen; no write may be attempted.
    Locked,
    /// Record accepts writes.
    Unlocked,
    /// Record does not exist.
    NotFound,
}

/// Adapter failure.
///
/// Transport failures never reached the remote application; application
/// failures are answers from the remote system that carry an error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdapterError {
    /// Timeout, refused connection, unreadable body.
    #[error("{system} transport error: {message}")]
    Transport {
        system: &'static str,
        message: String,
        timed_out: bool,
    },

    /// Remote system answered with an error.
    #[error("{system} API error{}: {message}", status_suffix(.status))]
    Application {
        system: &'static str,
        status: Option<u16>,
        message: String,
        /// Remote error payload, kept verbatim for diagnosis.
        raw: Option<Value>,
    },
}

impl AdapterError {
    /// Transport failure.
    #[must_use]
    pub fn transport(system: &'static str, message: impl Into<String>) -> Self {
        Self::Transport {
            system,
            message: message.into(),
            timed_out: false,
        }
    }

    /// Call exceeded its deadline.
    #[must_use]
    pub fn timeout(system: &'static str, after: Duration) -> Self {
        Self::Transport {
            system,
            message: format!("no response within {}ms", after.as_millis()),
            timed_out: true,
        }
    }

    /// Application-level failure.
    #[must_use]
    pub fn application(system: &'static str, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Application {
            system,
            status,
            message: message.into(),
            raw: None,
        }
    }

    /// Attach the remote error payload.
    #[must_use]
    pub fn with_raw(self, payload: Value) -> Self {
        match self {
            Self::Application {
                system,
                status,
                message,
                ..
            } => Self::Application {
                system,
                status,
                message,
                raw: Some(payload),
            },
            other => other,
        }
    }

    /// Name of the system that failed.
    #[must_use]
    pub const fn system(&self) -> &'static str {
        match self {
            Self::Transport { system, .. } | Self::Application { system, .. } => system,
        }
    }

    /// Whether the failure happened below the application layer.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Whether a later attempt could plausibly succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Application { status, .. } => {
                matches!(status, Some(429 | 500..=599))
            }
        }
    }

    /// Remote payload for diagnosis, falling back to the message.
    #[must_use]
    pub fn diagnostic(&self) -> Value {
        match self {
            Self::Application {
                raw: Some(raw), ..
            } => raw.clone(),
            Self::Application {
                status, message, ..
            } => serde_json::json!({ "status": status, "message": message }),
            Self::Transport {
                message, timed_out, ..
            } => serde_json::json!({ "transport": message, "timedOut": timed_out }),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// A downstream record-keeping system.
#[async_trait]
pub trait RecordSystem: Send + Sync {
    /// Short name for logs and errors.
    fn system_name(&self) -> &'static str;

    /// Map an identifier the caller knows to this system's identifier.
    ///
    /// `Ok(None)` means the remote system answered and has no such record.
    async fn resolve_reference(&self, own_id: &str, auth: &Secret) -> AdapterResult<Option<String>>;

    /// Read the lock/frozen state of a record.
    async fn read_lock_state(&self, foreign_id: &str, auth: &Secret) -> AdapterResult<LockState>;

    /// Write exactly one field.
    async fn write_field(
        &self,
        foreign_id: &str,
        field: &str,
        value: &str,
        auth: &Secret,
    ) -> AdapterResult<()>;

    /// Attach a human-readable note to a record.
    async fn write_note(&self, foreign_id: &str, text: &str, auth: &Secret) -> AdapterResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let timeout = AdapterError::timeout("job_ledger", Duration::from_secs(10));
        assert!(timeout.is_transport());
        assert!(timeout.is_retryable());
        assert_eq!(timeout.system(), "job_ledger");

        let server = AdapterError::application("job_ledger", Some(503), "unavailable");
        assert!(!server.is_transport());
        assert!(server.is_retryable());

        let rate_limited = AdapterError::application("project_board", Some(429), "slow down");
        assert!(rate_limited.is_retryable());

        let rejected = AdapterError::application("job_ledger", Some(422), "bad field");
        assert!(!rejected.is_retryable());

        let in_body = AdapterError::application("project_board", None, "complexity budget");
        assert!(!in_body.is_retryable());
    }

    #[test]
    fn test_display_includes_status() {
        let err = AdapterError::application("job_ledger", Some(422), "bad field");
        assert_eq!(err.to_string(), "job_ledger API error (422): bad field");

        let err = AdapterError::application("project_board", None, "boom");
        assert_eq!(err.to_string(), "project_board API error: boom");
    }

    #[test]
    fn test_diagnostic_prefers_raw_payload() {
        let raw = serde_json::json!({ "success": false, "error": "field is read-only" });
        let err = AdapterError::application("job_ledger", Some(200), "field is read-only")
            .with_raw(raw.clone());
        assert_eq!(err.diagnostic(), raw);

        let transport = AdapterError::transport("job_ledger", "connection refused");
        assert_eq!(transport.diagnostic()["transport"], "connection refused");
        assert!(transport.clone().with_raw(raw).is_transport());
    }
}
