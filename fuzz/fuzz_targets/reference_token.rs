//! Reference Token Fuzz Target
//!
//! Fuzzes `validate` with arbitrary provided tokens.
//!
//! Goal: no panics; only the generated token validates.

#![no_main]

use libfuzzer_sys::fuzz_target;
use relay_core::Secret;

fuzz_target!(|data: &[u8]| {
    let Ok(provided) = std::str::from_utf8(data) else {
        return;
    };

    let secret = Secret::new("token_fuzz");
    let Ok(expected) = relay_webhook::generate("HH-900", "250.00", &secret) else {
        return;
    };

    if let Ok(valid) = relay_webhook::validate("HH-900", "250.00", provided, &secret) {
        assert_eq!(valid, provided == expected.as_str());
    }
});
