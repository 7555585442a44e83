//! Webhook bodies and signed header sets for both inbound channels.

use std::collections::HashMap;

use chrono::Utc;
use relay_core::Secret;
use relay_webhook::{BoardSignature, PaymentSignature};
use serde_json::{Value, json};

/// Payments signing secret used across fixtures.
pub const PAYMENTS_SECRET: &str = "whsec_fixture";
/// Board webhook secret used across fixtures.
pub const BOARD_SECRET: &str = "board_fixture";
/// Reference-token secret used across fixtures.
pub const TOKEN_SECRET: &str = "token_fixture";

/// `{"event": {"columnId", "value", "pulseId"}}` as sent by the board.
#[must_use]
pub fn board_date_event(pulse_id: u64, column_id: &str, date: &str) -> Value {
    json!({
        "event": {
            "columnId": column_id,
            "value": date,
            "pulseId": pulse_id,
        }
    })
}

/// Subscription handshake body.
#[must_use]
pub fn challenge(value: &str) -> Value {
    json!({ "challenge": value })
}

/// A completed checkout carrying job metadata.
#[must_use]
pub fn checkout_completed(session_id: &str, job_id: &str, amount: &str, token: &str) -> Value {
    json!({
        "id": format!("evt_{session_id}"),
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "amount_total": 25_000,
                "currency": "usd",
                "payment_intent": format!("pi_{session_id}"),
                "metadata": {
                    "job_id": job_id,
                    "amount": amount,
                    "token": token,
                }
            }
        }
    })
}

/// Serialize a fixture body.
#[must_use]
pub fn body(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

/// Headers carrying a valid board signature under [`BOARD_SECRET`].
#[must_use]
pub fn board_headers(body: &[u8]) -> HashMap<String, String> {
    let signature = BoardSignature::new(Secret::new(BOARD_SECRET)).sign(body);
    HashMap::from([("x-board-signature".to_string(), signature)])
}

/// Headers carrying a valid, current payments signature under [`PAYMENTS_SECRET`].
#[must_use]
pub fn payment_headers(body: &[u8]) -> HashMap<String, String> {
    payment_headers_at(body, Utc::now().timestamp())
}

/// Payments signature for a specific signing time.
#[must_use]
pub fn payment_headers_at(body: &[u8], timestamp: i64) -> HashMap<String, String> {
    let signature = PaymentSignature::new(Secret::new(PAYMENTS_SECRET)).sign(body, timestamp);
    HashMap::from([("stripe-signature".to_string(), signature)])
}
