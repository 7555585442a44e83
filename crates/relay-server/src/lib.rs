//! Relay Server - HTTP surface for the webhook relay
//!
//! Routes:
//! - `POST /webhook` - channel picked from the headers
//! - `POST /webhook/payments` - payment-processor deliveries
//! - `POST /webhook/board` - project-board deliveries
//! - `GET /health` - liveness
//!
//! Every path answers `OPTIONS` with permissive CORS headers; other methods
//! on the webhook routes get `405`.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod error;
mod routes;
mod state;

pub use config::*;
pub use error::*;
pub use routes::build_router;
pub use state::*;
