//! Relay Project Board Adapter
//!
//! GraphQL adapter for the project board. Requests carry the API token as a
//! bearer credential.
//!
//! ## Operations
//!
//! - `items` query - resolve an item's job number and read its state
//! - `change_simple_column_value` mutation - write a single column
//! - `create_update` mutation - post an audit update on an item

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod config;
mod connector;
mod error;
mod types;

pub use client::BoardApiClient;
pub use config::BoardConfig;
pub use connector::ProjectBoard;
pub use error::{BoardError, BoardResult};
pub use types::{BoardItem, GraphqlError};

/// Name reported in logs and adapter errors.
pub const SYSTEM_NAME: &str = "project_board";
