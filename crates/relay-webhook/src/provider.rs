//! Channel-specific signature schemes.
//!
//! Both schemes authenticate the raw request bytes. Nothing here parses JSON;
//! the body is only handed to `serde_json` after one of these has accepted it.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use relay_core::Secret;
use subtle::Choice;

use crate::{
    DEFAULT_MAX_PAYLOAD_SIZE, DEFAULT_TIMESTAMP_TOLERANCE, HmacSha256Verifier, SignatureVerifier,
    WebhookError, WebhookResult,
};

/// Header carrying the payment processor's signature.
pub const PAYMENT_SIGNATURE_HEADER: &str = "stripe-signature";

/// Header carrying the project board's body signature.
pub const BOARD_SIGNATURE_HEADER: &str = "x-board-signature";

/// Case-insensitive header lookup.
#[must_use]
pub fn header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn check_size(body: &[u8], limit: usize) -> WebhookResult<()> {
    if body.len() > limit {
        return Err(WebhookError::PayloadTooLarge {
            size: body.len(),
            limit,
        });
    }
    Ok(())
}

/// Parsed `t=<unix>,v1=<hex>[,v1=<hex>...]` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSignatureHeader {
    /// Signing timestamp (unix seconds).
    pub timestamp: i64,
    /// Every `v1` candidate, in header order.
    pub signatures: Vec<String>,
}

impl PaymentSignatureHeader {
    /// Parse the header value. Unknown schemes (`v0=` and the like) are skipped.
    ///
    /// # Errors
    ///
    /// Fails when the timestamp is missing or non-numeric, or no `v1` entry exists.
    pub fn parse(value: &str) -> WebhookResult<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in value.split(',').map(str::trim) {
            if let Some(ts) = part.strip_prefix("t=") {
                timestamp = Some(ts.parse::<i64>().map_err(|_| {
                    WebhookError::MalformedSignatureHeader(format!("non-numeric timestamp: {ts}"))
                })?);
            } else if let Some(sig) = part.strip_prefix("v1=") {
                signatures.push(sig.to_string());
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| WebhookError::MalformedSignatureHeader("missing t= entry".into()))?;
        if signatures.is_empty() {
            return Err(WebhookError::MalformedSignatureHeader(
                "missing v1= entry".into(),
            ));
        }
        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

/// Payment-processor signature scheme.
///
/// Signed payload is `"<t>." ++ raw_body`; any `v1` candidate may match.
#[derive(Debug)]
pub struct PaymentSignature {
    verifier: HmacSha256Verifier,
    timestamp_tolerance: Duration,
    max_payload_size: usize,
}

impl PaymentSignature {
    #[must_use]
    pub const fn new(secret: Secret) -> Self {
        Self {
            verifier: HmacSha256Verifier::new(secret),
            timestamp_tolerance: DEFAULT_TIMESTAMP_TOLERANCE,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }

    /// Set timestamp tolerance.
    #[must_use]
    pub const fn with_timestamp_tolerance(mut self, tolerance: Duration) -> Self {
        self.timestamp_tolerance = tolerance;
        self
    }

    /// Set the maximum accepted body size.
    #[must_use]
    pub const fn with_max_payload_size(mut self, limit: usize) -> Self {
        self.max_payload_size = limit;
        self
    }

    /// Verify a delivery against the current clock.
    ///
    /// # Errors
    ///
    /// See [`Self::verify_at`].
    pub fn verify(&self, headers: &HashMap<String, String>, body: &[u8]) -> WebhookResult<()> {
        self.verify_at(headers, body, Utc::now().timestamp())
    }

    /// Verify a delivery as of `now` (unix seconds).
    ///
    /// # Errors
    ///
    /// Oversized bodies, a missing or malformed header, a stale timestamp, or
    /// no matching `v1` candidate.
    pub fn verify_at(
        &self,
        headers: &HashMap<String, String>,
        body: &[u8],
        now: i64,
    ) -> WebhookResult<()> {
        check_size(body, self.max_payload_size)?;

        let value = header(headers, PAYMENT_SIGNATURE_HEADER)
            .ok_or_else(|| WebhookError::MissingSignature("Stripe-Signature".into()))?;
        let parsed = PaymentSignatureHeader::parse(value)?;
        self.validate_timestamp(parsed.timestamp, now)?;

        let mut signed_payload = parsed.timestamp.to_string().into_bytes();
        signed_payload.push(b'.');
        signed_payload.extend_from_slice(body);

        let matched = parsed
            .signatures
            .iter()
            .fold(Choice::from(0), |acc, sig| {
                acc | self.verifier.matches(&signed_payload, sig)
            });

        if bool::from(matched) {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }

    /// Compute the header value for `body` signed at `timestamp`.
    #[must_use]
    pub fn sign(&self, body: &[u8], timestamp: i64) -> String {
        let mut signed_payload = timestamp.to_string().into_bytes();
        signed_payload.push(b'.');
        signed_payload.extend_from_slice(body);
        format!("t={timestamp},v1={}", self.verifier.compute(&signed_payload))
    }

    fn validate_timestamp(&self, timestamp: i64, now: i64) -> WebhookResult<()> {
        let tolerance = i64::try_from(self.timestamp_tolerance.as_secs()).unwrap_or(i64::MAX);

        if now.saturating_sub(timestamp).abs() > tolerance {
            return Err(WebhookError::TimestampValidation {
                reason: "Timestamp outside tolerance window".into(),
                timestamp: Some(timestamp),
                current_time: now,
                tolerance: self.timestamp_tolerance,
            });
        }
        Ok(())
    }
}

/// Project-board signature scheme: `X-Board-Signature: sha256=<hex>` over the raw body.
#[derive(Debug)]
pub struct BoardSignature {
    verifier: HmacSha256Verifier,
    max_payload_size: usize,
}

impl BoardSignature {
    #[must_use]
    pub const fn new(secret: Secret) -> Self {
        Self {
            verifier: HmacSha256Verifier::new(secret),
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }

    /// Set the maximum accepted body size.
    #[must_use]
    pub const fn with_max_payload_size(mut self, limit: usize) -> Self {
        self.max_payload_size = limit;
        self
    }

    /// Verify the body signature.
    ///
    /// # Errors
    ///
    /// Oversized bodies, a missing header, or a mismatching signature.
    pub fn verify(&self, headers: &HashMap<String, String>, body: &[u8]) -> WebhookResult<()> {
        check_size(body, self.max_payload_size)?;
        let signature = header(headers, BOARD_SIGNATURE_HEADER)
            .ok_or_else(|| WebhookError::MissingSignature("X-Board-Signature".into()))?;
        self.verifier.verify(body, signature)
    }

    /// Compute the header value for `body`.
    #[must_use]
    pub fn sign(&self, body: &[u8]) -> String {
        format!("sha256={}", self.verifier.compute(body))
    }
}
