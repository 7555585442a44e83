//! Payment Signature Fuzz Target
//!
//! Fuzzes `Stripe-Signature` header parsing and full verification with
//! attacker-controlled header and body.
//!
//! Goal: no panics; arbitrary input never verifies.

#![no_main]

use std::collections::HashMap;

use libfuzzer_sys::fuzz_target;
use relay_core::Secret;
use relay_webhook::{PaymentSignature, PaymentSignatureHeader};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let _ = PaymentSignatureHeader::parse(text);

    // First line is the header, the rest is the body
    let (header, body) = text.split_once('\n').unwrap_or((text, ""));
    let headers = HashMap::from([("stripe-signature".to_string(), header.to_string())]);
    let scheme = PaymentSignature::new(Secret::new("whsec_fuzz"));
    assert!(scheme.verify_at(&headers, body.as_bytes(), 1_700_000_000).is_err());
});
