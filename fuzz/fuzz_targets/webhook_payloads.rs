//! Webhook Payload Fuzz Target
//!
//! Fuzzes the boundary parsers and the router on both channels:
//! - `BoardPayload` / `PaymentPayload` deserialization
//! - Column value date extraction
//! - Unsigned routing with the board channel opened
//!
//! Goal: no panics on arbitrary input.

#![no_main]

use std::collections::HashMap;

use libfuzzer_sys::fuzz_target;
use relay_core::SourceSystem;
use relay_webhook::{BoardPayload, PaymentPayload, RouterConfig, WebhookRouter};

fuzz_target!(|data: &[u8]| {
    if let Ok(BoardPayload::Event(envelope)) = serde_json::from_slice::<BoardPayload>(data) {
        if let Some(value) = envelope.event.value {
            let _ = value.as_date();
        }
    }
    let _ = serde_json::from_slice::<PaymentPayload>(data);

    let router = WebhookRouter::new(RouterConfig {
        allow_unsigned_board_events: true,
        ..RouterConfig::default()
    });
    let headers = HashMap::new();
    let _ = router.route(SourceSystem::ProjectBoard, &headers, data);
    let _ = router.route(SourceSystem::Payments, &headers, data);
});
