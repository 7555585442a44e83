//! Inbound routing: `Unverified -> Verified -> Classified`, or `Rejected`.
//!
//! Verification always runs on the raw bytes. Only a [`Verified`] delivery can
//! be parsed, and only a [`Classified`] one is handed to orchestration.

use std::collections::HashMap;
use std::time::Duration;

use relay_core::{EventKind, Secret, SourceSystem, WebhookEvent};
use tracing::{debug, warn};

use crate::event::{
    BoardEvent, BoardPayload, CHECKOUT_COMPLETED, CheckoutCompleted, CheckoutSession,
    ChallengeHandshake, ClassifiedEvent, DateChange, PaymentPayload,
};
use crate::provider::{BOARD_SIGNATURE_HEADER, PAYMENT_SIGNATURE_HEADER, header};
use crate::{
    BoardSignature, DEFAULT_MAX_PAYLOAD_SIZE, DEFAULT_TIMESTAMP_TOLERANCE, PaymentSignature,
    WebhookError, WebhookResult,
};

/// Board event type assumed when the payload carries none.
const DEFAULT_BOARD_EVENT_TYPE: &str = "update_column_value";

/// Router configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Largest body accepted on either channel.
    pub max_payload_size: usize,
    /// Replay window for payment signatures.
    pub timestamp_tolerance: Duration,
    /// Board column whose changes are synced as the outgoing date.
    pub date_column: String,
    /// Accept unsigned board events when no board secret is configured.
    pub allow_unsigned_board_events: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            timestamp_tolerance: DEFAULT_TIMESTAMP_TOLERANCE,
            date_column: "date".to_string(),
            allow_unsigned_board_events: false,
        }
    }
}

/// Outcome of routing one delivery.
#[derive(Debug)]
pub enum RouteDecision {
    /// Handshake: echo the value verbatim.
    Challenge(String),
    /// Verified event of a known kind.
    Dispatch(ClassifiedEvent),
    /// Verified but nothing to do.
    Ignored {
        event_type: String,
        reason: &'static str,
    },
    /// Failed verification or parsing. No downstream call may follow.
    Rejected(WebhookError),
}

// ─────────────────────────────────────────────────────────────────────────────
// States
// ─────────────────────────────────────────────────────────────────────────────

/// A delivery nobody has vouched for yet.
#[derive(Debug)]
pub struct Unverified<'a> {
    source: SourceSystem,
    headers: &'a HashMap<String, String>,
    body: &'a [u8],
}

impl<'a> Unverified<'a> {
    #[must_use]
    pub const fn new(
        source: SourceSystem,
        headers: &'a HashMap<String, String>,
        body: &'a [u8],
    ) -> Self {
        Self {
            source,
            headers,
            body,
        }
    }
}

/// How a verified delivery earned its trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trust {
    /// Signature checked against a configured secret.
    Signed,
    /// Accepted without a signature (handshakes, or explicitly allowed).
    Unsigned,
}

/// A delivery whose raw bytes passed the channel's trust policy.
#[derive(Debug)]
pub struct Verified<'a> {
    source: SourceSystem,
    body: &'a [u8],
    trust: Trust,
    signature: Option<String>,
}

impl Verified<'_> {
    #[must_use]
    pub const fn trust(&self) -> Trust {
        self.trust
    }

    #[must_use]
    pub const fn source(&self) -> SourceSystem {
        self.source
    }
}

/// Terminal state handed to orchestration.
#[derive(Debug)]
pub struct Classified(ClassifiedEvent);

impl Classified {
    #[must_use]
    pub fn into_event(self) -> ClassifiedEvent {
        self.0
    }
}

enum Classification {
    Challenge(String),
    Known(Classified),
    Ignored {
        event_type: String,
        reason: &'static str,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Verifies and classifies deliveries for both inbound channels.
#[derive(Debug)]
pub struct WebhookRouter {
    config: RouterConfig,
    payments: Option<PaymentSignature>,
    board: Option<BoardSignature>,
}

impl WebhookRouter {
    /// Create a router with no secrets; both channels fail closed until configured.
    #[must_use]
    pub const fn new(config: RouterConfig) -> Self {
        Self {
            config,
            payments: None,
            board: None,
        }
    }

    /// Configure the payment-processor signing secret. Blank secrets are ignored.
    #[must_use]
    pub fn with_payments_secret(mut self, secret: Secret) -> Self {
        self.payments = (!secret.is_empty()).then(|| {
            PaymentSignature::new(secret)
                .with_timestamp_tolerance(self.config.timestamp_tolerance)
                .with_max_payload_size(self.config.max_payload_size)
        });
        self
    }

    /// Configure the board webhook secret. Blank secrets are ignored.
    #[must_use]
    pub fn with_board_secret(mut self, secret: Secret) -> Self {
        self.board = (!secret.is_empty()).then(|| {
            BoardSignature::new(secret).with_max_payload_size(self.config.max_payload_size)
        });
        self
    }

    #[must_use]
    pub const fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Pick the channel for a delivery on the shared endpoint.
    #[must_use]
    pub fn channel_for(headers: &HashMap<String, String>) -> SourceSystem {
        if header(headers, PAYMENT_SIGNATURE_HEADER).is_some() {
            SourceSystem::Payments
        } else {
            SourceSystem::ProjectBoard
        }
    }

    /// Route one delivery.
    #[must_use]
    pub fn route(
        &self,
        source: SourceSystem,
        headers: &HashMap<String, String>,
        body: &[u8],
    ) -> RouteDecision {
        let verified = match self.verify(Unverified::new(source, headers, body)) {
            Ok(verified) => verified,
            Err(err) => {
                warn!(%source, error = %err, "Webhook rejected before parsing");
                return RouteDecision::Rejected(err);
            }
        };

        match self.classify(verified) {
            Ok(Classification::Challenge(value)) => {
                debug!(%source, "Echoing subscription challenge");
                RouteDecision::Challenge(value)
            }
            Ok(Classification::Known(classified)) => RouteDecision::Dispatch(classified.into_event()),
            Ok(Classification::Ignored { event_type, reason }) => {
                debug!(%source, event_type = %event_type, reason, "Webhook ignored");
                RouteDecision::Ignored { event_type, reason }
            }
            Err(err) => {
                warn!(%source, error = %err, "Webhook payload rejected");
                RouteDecision::Rejected(err)
            }
        }
    }

    /// Apply the channel's trust policy to the raw bytes.
    ///
    /// # Errors
    ///
    /// Any signature failure, an oversized body, or an unconfigured channel.
    pub fn verify<'a>(&self, delivery: Unverified<'a>) -> WebhookResult<Verified<'a>> {
        match delivery.source {
            SourceSystem::Payments => self.verify_payments(delivery),
            SourceSystem::ProjectBoard => self.verify_board(delivery),
        }
    }

    fn verify_payments<'a>(&self, delivery: Unverified<'a>) -> WebhookResult<Verified<'a>> {
        let scheme = self.payments.as_ref().ok_or_else(|| {
            WebhookError::ProviderNotConfigured("payments webhook secret".into())
        })?;
        scheme.verify(delivery.headers, delivery.body)?;

        Ok(Verified {
            source: delivery.source,
            body: delivery.body,
            trust: Trust::Signed,
            signature: header(delivery.headers, PAYMENT_SIGNATURE_HEADER).map(str::to_string),
        })
    }

    fn verify_board<'a>(&self, delivery: Unverified<'a>) -> WebhookResult<Verified<'a>> {
        if delivery.body.len() > self.config.max_payload_size {
            return Err(WebhookError::PayloadTooLarge {
                size: delivery.body.len(),
                limit: self.config.max_payload_size,
            });
        }

        let signature = header(delivery.headers, BOARD_SIGNATURE_HEADER);
        let trust = match (&self.board, signature) {
            (Some(scheme), Some(_)) => {
                scheme.verify(delivery.headers, delivery.body)?;
                Trust::Signed
            }
            // Handshakes carry no authority and are answered unsigned
            (_, _) if is_challenge(delivery.body) => Trust::Unsigned,
            (Some(_), None) => {
                return Err(WebhookError::MissingSignature("X-Board-Signature".into()));
            }
            (None, _) if self.config.allow_unsigned_board_events => {
                warn!("Accepting unsigned board event; configure a board webhook secret");
                Trust::Unsigned
            }
            (None, _) => {
                return Err(WebhookError::ProviderNotConfigured(
                    "board webhook secret".into(),
                ));
            }
        };

        Ok(Verified {
            source: delivery.source,
            body: delivery.body,
            trust,
            signature: signature
                .filter(|_| trust == Trust::Signed)
                .map(str::to_string),
        })
    }

    fn classify(&self, verified: Verified<'_>) -> WebhookResult<Classification> {
        match verified.source {
            SourceSystem::ProjectBoard => self.classify_board(verified),
            SourceSystem::Payments => Self::classify_payment(verified),
        }
    }

    fn classify_board(&self, verified: Verified<'_>) -> WebhookResult<Classification> {
        let event = match serde_json::from_slice::<BoardPayload>(verified.body)? {
            BoardPayload::Challenge(handshake) => {
                return Ok(Classification::Challenge(handshake.challenge));
            }
            BoardPayload::Event(envelope) => envelope.event,
        };
        // Unsigned non-challenge events only get here when explicitly allowed

        let BoardEvent {
            pulse_id,
            column_id,
            event_type,
            value,
            ..
        } = event;
        let event_type = event_type.unwrap_or_else(|| DEFAULT_BOARD_EVENT_TYPE.to_string());

        let Some(column_id) = column_id else {
            return Ok(Classification::Ignored {
                event_type,
                reason: "event has no synced column",
            });
        };
        if column_id != self.config.date_column {
            return Ok(Classification::Ignored {
                event_type: format!("{event_type}:{column_id}"),
                reason: "column is not synced",
            });
        }
        let Some(value) = value else {
            return Ok(Classification::Ignored {
                event_type: EventKind::DateFieldChanged.as_str().to_string(),
                reason: "date was cleared",
            });
        };
        let date = value.as_date().ok_or_else(|| {
            WebhookError::InvalidPayload(format!("column {column_id} does not carry a date"))
        })?;

        let mut normalized = WebhookEvent::new(
            SourceSystem::ProjectBoard,
            event_type,
            pulse_id.to_string(),
            date.format(crate::DATE_FORMAT).to_string(),
        )
        .with_changed_field(column_id);
        if let Some(signature) = verified.signature {
            normalized = normalized.with_raw_signature(signature);
        }

        Ok(Classification::Known(Classified(ClassifiedEvent::DateChanged(
            DateChange {
                event: normalized,
                date,
            },
        ))))
    }

    fn classify_payment(verified: Verified<'_>) -> WebhookResult<Classification> {
        let payload: PaymentPayload = serde_json::from_slice(verified.body)?;
        if payload.event_type != CHECKOUT_COMPLETED {
            return Ok(Classification::Ignored {
                event_type: payload.event_type,
                reason: "event type not handled",
            });
        }

        let session: CheckoutSession = serde_json::from_value(payload.data.object)?;
        if session.metadata.is_empty() {
            return Ok(Classification::Ignored {
                event_type: payload.event_type,
                reason: "checkout has no job metadata",
            });
        }

        let metadata = session.metadata;
        let (Some(job_id), Some(amount), Some(token)) =
            (metadata.job_id, metadata.amount, metadata.token)
        else {
            return Err(WebhookError::InvalidPayload(
                "checkout metadata requires job_id, amount and token".into(),
            ));
        };

        let mut normalized = WebhookEvent::new(
            SourceSystem::Payments,
            payload.event_type,
            session.id.clone(),
            amount.clone(),
        );
        if let Some(signature) = verified.signature {
            normalized = normalized.with_raw_signature(signature);
        }

        Ok(Classification::Known(Classified(
            ClassifiedEvent::CheckoutCompleted(CheckoutCompleted {
                event: normalized,
                session_id: session.id,
                job_id,
                amount,
                token,
                payment_intent: session.payment_intent.map(|pi| pi.id().to_string()),
            }),
        )))
    }
}

fn is_challenge(body: &[u8]) -> bool {
    serde_json::from_slice::<ChallengeHandshake>(body).is_ok()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use serde_json::json;

    use super::*;

    fn router() -> WebhookRouter {
        WebhookRouter::new(RouterConfig::default())
            .with_payments_secret(Secret::new("whsec_test"))
            .with_board_secret(Secret::new("board-secret"))
    }

    fn board_headers(body: &[u8]) -> HashMap<String, String> {
        let sig = BoardSignature::new(Secret::new("board-secret")).sign(body);
        HashMap::from([("X-Board-Signature".to_string(), sig)])
    }

    fn payment_headers(body: &[u8]) -> HashMap<String, String> {
        let sig = PaymentSignature::new(Secret::new("whsec_test")).sign(body, Utc::now().timestamp());
        HashMap::from([("Stripe-Signature".to_string(), sig)])
    }

    fn checkout_body(metadata: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_1", "payment_intent": "pi_1", "metadata": metadata}}
        }))
        .unwrap()
    }

    #[test]
    fn test_signed_board_date_change_dispatches() {
        let body = br#"{"event":{"columnId":"date","value":"2024-06-01","pulseId":123}}"#;
        let decision = router().route(SourceSystem::ProjectBoard, &board_headers(body), body);

        let RouteDecision::Dispatch(ClassifiedEvent::DateChanged(change)) = decision else {
            panic!("expected dispatch, got {decision:?}");
        };
        assert_eq!(change.item_id(), "123");
        assert_eq!(change.date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(change.event.new_value(), "2024-06-01");
        assert_eq!(change.event.changed_field(), Some("date"));
        assert!(change.event.raw_signature().is_some());
    }

    #[test]
    fn test_bad_board_signature_rejected() {
        let body = br#"{"event":{"columnId":"date","value":"2024-06-01","pulseId":123}}"#;
        let headers = HashMap::from([(
            "x-board-signature".to_string(),
            format!("sha256={}", "00".repeat(32)),
        )]);
        let decision = router().route(SourceSystem::ProjectBoard, &headers, body);
        assert!(matches!(
            decision,
            RouteDecision::Rejected(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn test_missing_board_signature_rejected() {
        let body = br#"{"event":{"columnId":"date","value":"2024-06-01","pulseId":123}}"#;
        let decision = router().route(SourceSystem::ProjectBoard, &HashMap::new(), body);
        assert!(matches!(
            decision,
            RouteDecision::Rejected(WebhookError::MissingSignature(_))
        ));
    }

    #[test]
    fn test_challenge_echoed_without_signature() {
        let body = br#"{"challenge":"abc123"}"#;
        let decision = router().route(SourceSystem::ProjectBoard, &HashMap::new(), body);
        assert!(matches!(decision, RouteDecision::Challenge(ref v) if v == "abc123"));

        let unconfigured = WebhookRouter::new(RouterConfig::default());
        let decision = unconfigured.route(SourceSystem::ProjectBoard, &HashMap::new(), body);
        assert!(matches!(decision, RouteDecision::Challenge(ref v) if v == "abc123"));
    }

    #[test]
    fn test_unconfigured_board_fails_closed() {
        let body = br#"{"event":{"columnId":"date","value":"2024-06-01","pulseId":123}}"#;
        let decision = WebhookRouter::new(RouterConfig::default()).route(
            SourceSystem::ProjectBoard,
            &HashMap::new(),
            body,
        );
        assert!(matches!(
            decision,
            RouteDecision::Rejected(WebhookError::ProviderNotConfigured(_))
        ));
    }

    #[test]
    fn test_unsigned_board_events_when_allowed() {
        let config = RouterConfig {
            allow_unsigned_board_events: true,
            ..RouterConfig::default()
        };
        let body = br#"{"event":{"columnId":"date","value":{"date":"2024-06-01"},"pulseId":"77"}}"#;
        let router = WebhookRouter::new(config);
        let empty = HashMap::new();
        let verified = router
            .verify(Unverified::new(SourceSystem::ProjectBoard, &empty, body))
            .unwrap();
        assert_eq!(verified.trust(), Trust::Unsigned);

        let decision = router.route(SourceSystem::ProjectBoard, &empty, body);
        let RouteDecision::Dispatch(ClassifiedEvent::DateChanged(change)) = decision else {
            panic!("expected dispatch, got {decision:?}");
        };
        assert_eq!(change.item_id(), "77");
        assert!(change.event.raw_signature().is_none());
    }

    #[test]
    fn test_other_column_ignored() {
        let body = br#"{"event":{"columnId":"status","value":{"label":{"text":"Done"}},"pulseId":1}}"#;
        let decision = router().route(SourceSystem::ProjectBoard, &board_headers(body), body);
        assert!(matches!(decision, RouteDecision::Ignored { .. }));
    }

    #[test]
    fn test_item_event_without_column_ignored() {
        let body = br#"{"event":{"type":"create_pulse","pulseId":123,"boardId":55,"pulseName":"New job"}}"#;
        let decision = router().route(SourceSystem::ProjectBoard, &board_headers(body), body);
        let RouteDecision::Ignored { event_type, reason } = decision else {
            panic!("expected ignored, got {decision:?}");
        };
        assert_eq!(event_type, "create_pulse");
        assert_eq!(reason, "event has no synced column");
    }

    #[test]
    fn test_unsigned_item_event_without_column_still_rejected() {
        let body = br#"{"event":{"type":"create_pulse","pulseId":1}}"#;
        let decision = router().route(SourceSystem::ProjectBoard, &HashMap::new(), body);
        assert!(matches!(decision, RouteDecision::Rejected(_)));
    }

    #[test]
    fn test_cleared_date_ignored() {
        let body = br#"{"event":{"columnId":"date","value":null,"pulseId":1}}"#;
        let decision = router().route(SourceSystem::ProjectBoard, &board_headers(body), body);
        assert!(matches!(
            decision,
            RouteDecision::Ignored { reason: "date was cleared", .. }
        ));
    }

    #[test]
    fn test_non_date_value_is_malformed() {
        let body = br#"{"event":{"columnId":"date","value":"soon","pulseId":1}}"#;
        let decision = router().route(SourceSystem::ProjectBoard, &board_headers(body), body);
        assert!(matches!(
            decision,
            RouteDecision::Rejected(WebhookError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_signed_garbage_is_malformed() {
        let body = b"not json";
        let decision = router().route(SourceSystem::ProjectBoard, &board_headers(body), body);
        assert!(matches!(
            decision,
            RouteDecision::Rejected(WebhookError::JsonError(_))
        ));
    }

    #[test]
    fn test_checkout_dispatches() {
        let body = checkout_body(
            json!({"job_id": "HH-900", "amount": "250.00", "token": "0123456789abcdef"}),
        );
        let decision = router().route(SourceSystem::Payments, &payment_headers(&body), &body);
        let RouteDecision::Dispatch(ClassifiedEvent::CheckoutCompleted(checkout)) = decision else {
            panic!("expected dispatch, got {decision:?}");
        };
        assert_eq!(checkout.job_id, "HH-900");
        assert_eq!(checkout.amount, "250.00");
        assert_eq!(checkout.payment_intent.as_deref(), Some("pi_1"));
        assert_eq!(checkout.event.external_item_id(), "cs_1");
    }

    #[test]
    fn test_checkout_without_metadata_ignored() {
        let body = checkout_body(json!({}));
        let decision = router().route(SourceSystem::Payments, &payment_headers(&body), &body);
        assert!(matches!(decision, RouteDecision::Ignored { .. }));
    }

    #[test]
    fn test_checkout_with_partial_metadata_malformed() {
        let body = checkout_body(json!({"job_id": "HH-900"}));
        let decision = router().route(SourceSystem::Payments, &payment_headers(&body), &body);
        assert!(matches!(
            decision,
            RouteDecision::Rejected(WebhookError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_unknown_payment_event_ignored() {
        let body = serde_json::to_vec(&json!({
            "id": "evt_2", "type": "invoice.paid", "data": {"object": {}}
        }))
        .unwrap();
        let decision = router().route(SourceSystem::Payments, &payment_headers(&body), &body);
        assert!(matches!(
            decision,
            RouteDecision::Ignored { ref event_type, .. } if event_type == "invoice.paid"
        ));
    }

    #[test]
    fn test_unconfigured_payments_fail_closed() {
        let body = checkout_body(json!({}));
        let decision = WebhookRouter::new(RouterConfig::default())
            .with_payments_secret(Secret::new("   "))
            .route(SourceSystem::Payments, &payment_headers(&body), &body);
        assert!(matches!(
            decision,
            RouteDecision::Rejected(WebhookError::ProviderNotConfigured(_))
        ));
    }

    #[test]
    fn test_channel_detection() {
        let body = b"{}";
        assert_eq!(
            WebhookRouter::channel_for(&payment_headers(body)),
            SourceSystem::Payments
        );
        assert_eq!(
            WebhookRouter::channel_for(&board_headers(body)),
            SourceSystem::ProjectBoard
        );
    }
}
