//! Terminal result of one orchestration run.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Error string reported when the target record is locked.
pub const LOCKED: &str = "locked";

/// Outcome of one orchestration run, surfaced verbatim in the response body.
///
/// Serializes as `{success, jobId, appliedValue, <appliedKey>: value, error?,
/// duplicate?}`; the procedure-specific key (e.g. `outgoingDate`) mirrors
/// `appliedValue` so senders can read the field they care about by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub success: bool,
    pub job_id: Option<String>,
    pub applied_value: Option<String>,
    pub applied_key: Option<&'static str>,
    pub error: Option<String>,
    pub duplicate: bool,
}

impl SyncOutcome {
    /// The authoritative write landed.
    #[must_use]
    pub fn applied(job_id: impl Into<String>, key: &'static str, value: impl Into<String>) -> Self {
        Self {
            success: true,
            job_id: Some(job_id.into()),
            applied_value: Some(value.into()),
            applied_key: Some(key),
            error: None,
            duplicate: false,
        }
    }

    /// The target record is locked; nothing was written.
    #[must_use]
    pub fn locked(job_id: impl Into<String>) -> Self {
        Self {
            success: false,
            job_id: Some(job_id.into()),
            applied_value: None,
            applied_key: None,
            error: Some(LOCKED.to_string()),
            duplicate: false,
        }
    }

    /// The event was already applied by an earlier delivery.
    #[must_use]
    pub fn duplicate(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            success: true,
            job_id: None,
            applied_value: Some(value.into()),
            applied_key: Some(key),
            error: None,
            duplicate: true,
        }
    }

    /// Whether the run stopped on a locked record.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        !self.success && self.error.as_deref() == Some(LOCKED)
    }
}

impl Serialize for SyncOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("success", &self.success)?;
        if let Some(job_id) = &self.job_id {
            map.serialize_entry("jobId", job_id)?;
        }
        if let Some(value) = &self.applied_value {
            map.serialize_entry("appliedValue", value)?;
            if let Some(key) = self.applied_key {
                map.serialize_entry(key, value)?;
            }
        }
        if let Some(error) = &self.error {
            map.serialize_entry("error", error)?;
        }
        if self.duplicate {
            map.serialize_entry("duplicate", &true)?;
        }
        map.end()
    }
}
