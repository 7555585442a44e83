//! Normalized inbound event.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::IdempotencyKey;

/// Inbound channel an event arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSystem {
    /// Payment processor webhooks (signed by the processor).
    Payments,
    /// Project board field-change webhooks.
    ProjectBoard,
}

impl SourceSystem {
    /// Stable lowercase name used in logs and idempotency keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Payments => "payments",
            Self::ProjectBoard => "project_board",
        }
    }
}

impl fmt::Display for SourceSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of event kinds the relay acts on.
///
/// Anything else is `Unknown` and is acknowledged without side effects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A checkout session completed at the payment processor.
    CheckoutCompleted,
    /// The configured date column changed on a board item.
    DateFieldChanged,
    /// Any other event type, carried verbatim.
    Unknown(String),
}

impl EventKind {
    /// Whether the relay has a procedure for this kind.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Name used in logs and response bodies.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::CheckoutCompleted => "checkout_completed",
            Self::DateFieldChanged => "date_field_changed",
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The normalized result of parsing one inbound payload.
///
/// Built once per request after verification and never mutated afterwards;
/// fields are private and only readable through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookEvent {
    source_system: SourceSystem,
    event_type: String,
    external_item_id: String,
    changed_field: Option<String>,
    new_value: String,
    #[serde(skip)]
    raw_signature: Option<String>,
}

impl WebhookEvent {
    /// Create a new event.
    #[must_use]
    pub fn new(
        source_system: SourceSystem,
        event_type: impl Into<String>,
        external_item_id: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        Self {
            source_system,
            event_type: event_type.into(),
            external_item_id: external_item_id.into(),
            changed_field: None,
            new_value: new_value.into(),
            raw_signature: None,
        }
    }

    /// Set the field that changed at the source.
    #[must_use]
    pub fn with_changed_field(mut self, field: impl Into<String>) -> Self {
        self.changed_field = Some(field.into());
        self
    }

    /// Attach the signature header the event was verified with.
    #[must_use]
    pub fn with_raw_signature(mut self, signature: impl Into<String>) -> Self {
        self.raw_signature = Some(signature.into());
        self
    }

    #[must_use]
    pub const fn source_system(&self) -> SourceSystem {
        self.source_system
    }

    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    #[must_use]
    pub fn external_item_id(&self) -> &str {
        &self.external_item_id
    }

    #[must_use]
    pub fn changed_field(&self) -> Option<&str> {
        self.changed_field.as_deref()
    }

    #[must_use]
    pub fn new_value(&self) -> &str {
        &self.new_value
    }

    /// Signature header value, if the channel was signed.
    #[must_use]
    pub fn raw_signature(&self) -> Option<&str> {
        self.raw_signature.as_deref()
    }

    /// Idempotency key for this event.
    #[must_use]
    pub fn idempotency_key(&self) -> IdempotencyKey {
        IdempotencyKey::derive(
            self.source_system,
            &self.event_type,
            &self.external_item_id,
            &self.new_value,
        )
    }
}

/// A resolved mapping from a source item to a ledger job.
///
/// Owned by one orchestration run and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalRecordRef {
    pub source_system: SourceSystem,
    pub source_item_id: String,
    pub job_id: String,
}
