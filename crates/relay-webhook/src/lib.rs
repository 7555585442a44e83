//! Relay Webhook - inbound authentication and routing
//!
//! This crate turns raw webhook deliveries into verified, classified events:
//!
//! - **Signature Verification**: HMAC-SHA256 over the raw body, constant-time
//! - **Reference Tokens**: truncated keyed fingerprints for payment links
//! - **Provider Schemes**: payment-processor `t=,v1=` headers, board body HMAC
//! - **Routing**: `Unverified -> Verified -> Classified` or `Rejected`
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use relay_webhook::{RouteDecision, RouterConfig, WebhookRouter};
//!
//! let router = WebhookRouter::new(RouterConfig::default())
//!     .with_payments_secret(payments_secret)
//!     .with_board_secret(board_secret);
//!
//! match router.route(SourceSystem::ProjectBoard, &headers, &body) {
//!     RouteDecision::Challenge(value) => { /* echo */ }
//!     RouteDecision::Dispatch(event) => { /* orchestrate */ }
//!     RouteDecision::Ignored { .. } => { /* acknowledge */ }
//!     RouteDecision::Rejected(err) => { /* 4xx/5xx */ }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod error;
mod event;
mod provider;
mod router;
mod signature;
mod token;

pub use error::*;
pub use event::*;
pub use provider::*;
pub use router::*;
pub use signature::*;
pub use token::*;

use std::time::Duration;

/// Default timestamp tolerance for replay protection.
pub const DEFAULT_TIMESTAMP_TOLERANCE: Duration = Duration::from_secs(300); // 5 minutes

/// Default maximum payload size.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 5 * 1024 * 1024; // 5MB
