//! Project board error types.

use relay_core::AdapterError;
use serde_json::Value;
use thiserror::Error;

use crate::{SYSTEM_NAME, types::GraphqlError};

/// Project board errors.
#[derive(Error, Debug)]
pub enum BoardError {
    /// Request never got a usable answer.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// Board answered with a non-success status.
    #[error("Board API error {status}: {message}")]
    Api {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    /// Board answered 200 with GraphQL errors.
    #[error("GraphQL errors in {operation}: {}", join_messages(.errors))]
    Graphql {
        operation: &'static str,
        errors: Vec<GraphqlError>,
        body: Value,
    },

    /// Response body did not match the expected shape.
    #[error("Unexpected board response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Mutation succeeded without returning the entity it acted on.
    #[error("{0} returned no entity")]
    MissingEntity(&'static str),

    /// A setting the operation needs is missing.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

fn join_messages(errors: &[GraphqlError]) -> String {
    errors
        .iter()
        .map(|error| error.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<reqwest::Error> for BoardError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.without_url())
    }
}

impl BoardError {
    /// Check if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            Self::Graphql { .. }
            | Self::Decode(_)
            | Self::MissingEntity(_)
            | Self::NotConfigured(_) => false,
        }
    }

    /// Convert to the relay's adapter error.
    #[must_use]
    pub fn into_adapter_error(self) -> AdapterError {
        match self {
            Self::Http(err) => AdapterError::Transport {
                system: SYSTEM_NAME,
                timed_out: err.is_timeout(),
                message: err.to_string(),
            },
            Self::Api {
                status,
                message,
                body,
            } => {
                let err = AdapterError::application(SYSTEM_NAME, Some(status), message);
                match body {
                    Some(body) => err.with_raw(body),
                    None => err,
                }
            }
            Self::Graphql {
                operation,
                errors,
                body,
            } => AdapterError::application(
                SYSTEM_NAME,
                Some(200),
                format!("GraphQL errors in {operation}: {}", join_messages(&errors)),
            )
            .with_raw(body),
            Self::Decode(err) => AdapterError::application(SYSTEM_NAME, None, err.to_string()),
            Self::MissingEntity(operation) => AdapterError::application(
                SYSTEM_NAME,
                Some(200),
                format!("{operation} returned no entity"),
            ),
            Self::NotConfigured(setting) => AdapterError::application(
                SYSTEM_NAME,
                None,
                format!("{setting} is not configured"),
            ),
        }
    }
}

/// Result type for project board operations.
pub type BoardResult<T> = Result<T, BoardError>;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_graphql_error_conversion() {
        let err = BoardError::Graphql {
            operation: "items",
            errors: vec![
                GraphqlError {
                    message: "Column not found".into(),
                },
                GraphqlError {
                    message: "Permission denied".into(),
                },
            ],
            body: json!({"errors": [{"message": "Column not found"}]}),
        };
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "GraphQL errors in items: Column not found; Permission denied"
        );

        let adapter = err.into_adapter_error();
        assert!(!adapter.is_transport());
        assert_eq!(adapter.diagnostic()["errors"][0]["message"], "Column not found");
    }
}
