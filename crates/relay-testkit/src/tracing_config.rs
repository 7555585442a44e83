//! Tracing configuration for test output.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Initialize tracing for tests.
///
/// Safe to call from every test; only the first call installs a subscriber.
/// Uses `RUST_LOG` if set, otherwise `info` with relay crates at `debug`.
pub fn init_test_tracing() {
    init_test_tracing_with_filter_or_env("info,relay_sync=debug,relay_webhook=debug");
}

/// Initialize tracing with a specific filter, ignoring `RUST_LOG`.
pub fn init_test_tracing_with_filter(filter: &str) {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(EnvFilter::new(filter))
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .compact(),
            )
            .try_init()
            .ok();
    });
}

fn init_test_tracing_with_filter_or_env(default: &str) {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .compact(),
            )
            .try_init()
            .ok();
    });
}
