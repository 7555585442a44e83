//! Relay Sync - turns one verified event into ordered downstream writes
//!
//! Every procedure has the same shape:
//!
//! 1. Resolve the cross-system reference
//! 2. Read the target's lock state; a locked record ends the run
//! 3. Write the single field the event authorizes
//! 4. Leave best-effort audit notes
//!
//! Steps 1-3 form the authoritative phase and propagate failures. Step 4 is
//! advisory and only logs. Nothing is retried within one invocation; replays
//! from the sender are absorbed by the idempotency store.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod orchestrator;

pub use config::*;
pub use orchestrator::*;
