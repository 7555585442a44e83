//! Job ledger wire types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `GET /api/jobs/{ref}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct JobEnvelope {
    pub job: Job,
}

/// A ledger job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_number: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub status: Option<String>,
}

impl Job {
    /// Whether the job refuses writes.
    #[must_use]
    pub fn is_locked(&self, locked_statuses: &[String]) -> bool {
        self.locked
            || self.status.as_deref().is_some_and(|status| {
                locked_statuses
                    .iter()
                    .any(|locked| locked.eq_ignore_ascii_case(status))
            })
    }
}

/// `PATCH /api/jobs/{job}` body.
#[derive(Debug, Serialize)]
pub struct UpdateFields {
    pub fields: Map<String, Value>,
}

impl UpdateFields {
    /// A single-field update.
    #[must_use]
    pub fn single(field: &str, value: &str) -> Self {
        let mut fields = Map::new();
        fields.insert(field.to_string(), Value::String(value.to_string()));
        Self { fields }
    }
}

/// `POST /api/jobs/{job}/notes` body.
#[derive(Debug, Serialize)]
pub struct CreateNote<'a> {
    pub text: &'a str,
}

/// Application-level failure reported in a 2xx body.
#[derive(Debug, Deserialize)]
pub struct Acknowledgement {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Acknowledgement {
    /// Error message when the body reports a failure.
    #[must_use]
    pub fn failure(&self) -> Option<String> {
        (self.success == Some(false)).then(|| {
            self.error
                .clone()
                .or_else(|| self.message.clone())
                .unwrap_or_else(|| "request rejected".into())
        })
    }
}
