//! Relay Test Kit - fakes and mock infrastructure for the webhook relay
//!
//! - [`FakeRecordSystem`] - call-recording [`relay_core::RecordSystem`] double
//! - [`ScriptedStore`] - idempotency store with injectable failures
//! - [`MockApiServer`] - wiremock wrapper for connector tests
//! - [`fixtures`] - signed webhook bodies for both channels
//!
//! # Example
//!
//! ```rust,ignore
//! use relay_testkit::{FakeRecordSystem, Call};
//!
//! let board = FakeRecordSystem::new("project_board").with_reference("123", "HH-900");
//! let ledger = FakeRecordSystem::new("job_ledger").with_lock("HH-900", LockState::Locked);
//! // ... run the orchestrator ...
//! assert_eq!(ledger.write_count(), 0);
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod fakes;
pub mod fixtures;
mod mock_server;
mod tracing_config;

pub use fakes::*;
pub use mock_server::*;
pub use tracing_config::*;
