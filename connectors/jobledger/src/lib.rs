//! Relay Job Ledger Adapter
//!
//! REST adapter for the job ledger, the system of record the relay writes to.
//! Every request carries the API token as an `api_token` query parameter.
//!
//! ## Endpoints
//!
//! - `GET /api/jobs/{ref}` - resolve a job reference and read its lock state
//! - `PATCH /api/jobs/{job}` - write a single field
//! - `POST /api/jobs/{job}/notes` - append an audit note

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod config;
mod connector;
mod error;
mod types;

pub use client::LedgerApiClient;
pub use config::LedgerConfig;
pub use connector::JobLedger;
pub use error::{LedgerError, LedgerResult};
pub use types::Job;

/// Name reported in logs and adapter errors.
pub const SYSTEM_NAME: &str = "job_ledger";
