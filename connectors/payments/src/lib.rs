//! Relay Payments Adapter
//!
//! REST adapter for the payment processor. Requests authenticate with the
//! secret API key as a bearer credential; writes are form-encoded.
//!
//! ## Endpoints
//!
//! - `GET /v1/checkout/sessions/{id}` - resolve a checkout to its job
//! - `GET /v1/payment_intents/{id}` - read a payment's lock state
//! - `POST /v1/payment_intents/{id}` - write `metadata[...]` entries

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod config;
mod connector;
mod error;
mod types;

pub use client::PaymentsApiClient;
pub use config::PaymentsConfig;
pub use connector::Payments;
pub use error::{PaymentsError, PaymentsResult};
pub use types::{CheckoutSession, PaymentIntent};

/// Name reported in logs and adapter errors.
pub const SYSTEM_NAME: &str = "payments";
