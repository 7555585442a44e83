//! Orchestrator configuration.

use std::time::Duration;

use relay_core::Secret;
use serde::Deserialize;

/// Deadline applied to every adapter call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome key for the board date procedure.
pub const OUTGOING_DATE_KEY: &str = "outgoingDate";

/// Outcome key for the checkout procedure.
pub const AMOUNT_PAID_KEY: &str = "amountPaid";

/// Per-system API credentials, handed to adapters on every call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub payments_api_key: Secret,
    pub board_api_token: Secret,
    pub ledger_api_token: Secret,
}

/// Names of the ledger fields each procedure writes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FieldMapping {
    /// Written from the board's date column.
    pub outgoing_date: String,
    /// Written from a completed checkout.
    pub amount_paid: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            outgoing_date: "outgoing_date".to_string(),
            amount_paid: "amount_paid".to_string(),
        }
    }
}
