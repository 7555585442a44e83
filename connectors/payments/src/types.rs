//! Payments wire types.

use std::collections::HashMap;

use serde::Deserialize;

/// A checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    /// Ledger job the session was minted for.
    #[must_use]
    pub fn job_id(&self) -> Option<&str> {
        self.metadata
            .get("job_id")
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
    }
}

/// A payment intent.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    /// Canceled intents and intents flagged `metadata.locked = "true"` refuse writes.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.status == "canceled"
            || self
                .metadata
                .get("locked")
                .is_some_and(|flag| flag.eq_ignore_ascii_case("true"))
    }
}

/// `{"error": {...}}` error envelope.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Form fields for a metadata update: `metadata[<key>]=<value>`.
#[must_use]
pub fn metadata_form(key: &str, value: &str) -> Vec<(String, String)> {
    vec![(format!("metadata[{key}]"), value.to_string())]
}
