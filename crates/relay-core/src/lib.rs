//! Relay Core - shared types and seams for the webhook relay
//!
//! This crate holds everything the inbound side (signature checks, routing)
//! and the outbound side (record-system adapters, orchestration) agree on:
//!
//! - **Event model**: the normalized [`WebhookEvent`] and its [`SourceSystem`]
//! - **Outcomes**: [`SyncOutcome`], the body surfaced to webhook senders
//! - **Adapter seam**: the [`RecordSystem`] trait and its [`AdapterError`]
//! - **Idempotency seam**: [`IdempotencyKey`] and the [`IdempotencyStore`] trait
//! - **Error taxonomy**: [`SyncError`] with its HTTP status mapping
//! - **Secrets**: the redacting [`Secret`] wrapper

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod adapter;
mod error;
mod event;
mod idempotency;
mod outcome;
mod secret;

pub use adapter::*;
pub use error::*;
pub use event::*;
pub use idempotency::*;
pub use outcome::*;
pub use secret::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
