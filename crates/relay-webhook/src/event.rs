//! Inbound payload shapes.
//!
//! Each channel's body is parsed once into one of these types. Anything that
//! does not fit a known shape fails deserialization instead of being probed.

use std::fmt;

use chrono::NaiveDate;
use relay_core::WebhookEvent;
use serde::Deserialize;
use serde_json::Value;

/// Date format accepted from the board and written downstream.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Payment event type the relay acts on.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

// ─────────────────────────────────────────────────────────────────────────────
// Project board
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level board body: a subscription handshake or a column event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BoardPayload {
    /// `{"challenge": "..."}` with nothing else.
    Challenge(ChallengeHandshake),
    /// `{"event": {...}}`.
    Event(BoardEnvelope),
}

/// Handshake sent when a board subscription is created.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChallengeHandshake {
    pub challenge: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoardEnvelope {
    pub event: BoardEvent,
}

/// An event on a board item. Only column changes carry `column_id`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardEvent {
    /// Board item the event happened on.
    #[serde(alias = "itemId")]
    pub pulse_id: ItemId,
    #[serde(default)]
    pub column_id: Option<String>,
    #[serde(default)]
    pub board_id: Option<ItemId>,
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    /// `None` when the column was cleared.
    #[serde(default)]
    pub value: Option<ColumnValue>,
}

/// Board identifiers arrive as numbers or strings depending on the integration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Number(u64),
    Text(String),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Column value variants the board sends.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    /// `{"date": "2024-06-01", "time": "10:00:00"}`.
    Date {
        date: String,
        #[serde(default)]
        time: Option<String>,
    },
    /// `{"label": {"text": "Done"}}`.
    Label { label: LabelText },
    /// A bare string.
    Text(String),
    /// Any other JSON value.
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LabelText {
    #[serde(default)]
    pub text: Option<String>,
}

impl ColumnValue {
    /// The calendar date this value carries, if it is date-shaped and valid.
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date { date, .. } | Self::Text(date) => {
                NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).ok()
            }
            Self::Label { .. } | Self::Other(_) => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Payment processor
// ─────────────────────────────────────────────────────────────────────────────

/// Payment-processor event envelope. `data.object` depends on `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: PaymentData,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentData {
    pub object: Value,
}

/// The `data.object` of a completed checkout.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<Expandable>,
    #[serde(default)]
    pub metadata: CheckoutMetadata,
}

/// Metadata minted into the checkout by the payment link.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CheckoutMetadata {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl CheckoutMetadata {
    /// No relay metadata at all: the checkout was not started from a job link.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.job_id.is_none() && self.amount.is_none() && self.token.is_none()
    }
}

impl fmt::Debug for CheckoutMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutMetadata")
            .field("job_id", &self.job_id)
            .field("amount", &self.amount)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// An id, or the expanded object carrying it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) | Self::Object { id } => id,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Classified events
// ─────────────────────────────────────────────────────────────────────────────

/// A verified event of a kind the relay has a procedure for.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedEvent {
    DateChanged(DateChange),
    CheckoutCompleted(CheckoutCompleted),
}

impl ClassifiedEvent {
    /// The normalized event.
    #[must_use]
    pub const fn event(&self) -> &WebhookEvent {
        match self {
            Self::DateChanged(change) => &change.event,
            Self::CheckoutCompleted(checkout) => &checkout.event,
        }
    }
}

/// The configured date column changed on a board item.
#[derive(Debug, Clone, PartialEq)]
pub struct DateChange {
    pub event: WebhookEvent,
    pub date: NaiveDate,
}

impl DateChange {
    /// Board item id.
    #[must_use]
    pub fn item_id(&self) -> &str {
        self.event.external_item_id()
    }

    /// The date as written downstream.
    #[must_use]
    pub fn date_string(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }
}

/// A checkout completed with job metadata attached.
#[derive(Clone, PartialEq)]
pub struct CheckoutCompleted {
    pub event: WebhookEvent,
    pub session_id: String,
    pub job_id: String,
    pub amount: String,
    pub token: String,
    pub payment_intent: Option<String>,
}

impl fmt::Debug for CheckoutCompleted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutCompleted")
            .field("event", &self.event)
            .field("session_id", &self.session_id)
            .field("job_id", &self.job_id)
            .field("amount", &self.amount)
            .field("token", &"[REDACTED]")
            .field("payment_intent", &self.payment_intent)
            .finish()
    }
}
