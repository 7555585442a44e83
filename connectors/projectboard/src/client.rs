//! Project board GraphQL client.

use relay_core::Secret;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::{
    config::BoardConfig,
    error::{BoardError, BoardResult},
    types::{
        BoardItem, ChangeColumnValue, ChangeColumnVariables, CreateUpdate, CreateUpdateVariables,
        GraphqlOperation, GraphqlRequest, GraphqlResponse, ItemsQuery, ItemsVariables,
    },
};

/// Project board GraphQL client. Credentials are passed per call.
#[derive(Debug, Clone)]
pub struct BoardApiClient {
    client: Client,
    api_url: String,
}

impl BoardApiClient {
    /// Create a new API client from configuration.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: &BoardConfig) -> BoardResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("relay-projectboard/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }

    /// Set the GraphQL endpoint (for testing).
    #[must_use]
    pub fn with_base_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Execute one typed operation.
    ///
    /// # Errors
    ///
    /// Transport failures, non-success statuses, GraphQL errors, or data that
    /// does not match the operation's response type.
    pub async fn execute<O: GraphqlOperation>(
        &self,
        variables: &O::Variables,
        token: &Secret,
    ) -> BoardResult<O::ResponseData> {
        debug!(operation = O::OPERATION_NAME, "Executing board operation");
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(token.expose())
            .json(&GraphqlRequest {
                query: O::QUERY,
                variables,
            })
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(parse_error_response(status, &bytes));
        }

        let body: Value = serde_json::from_slice(&bytes)?;
        let parsed: GraphqlResponse = serde_json::from_value(body.clone())?;
        if !parsed.errors.is_empty() {
            return Err(BoardError::Graphql {
                operation: O::OPERATION_NAME,
                errors: parsed.errors,
                body,
            });
        }
        if let Some(message) = parsed.error_message {
            return Err(BoardError::Api {
                status: status.as_u16(),
                message,
                body: Some(body),
            });
        }

        let data = parsed.data.unwrap_or(Value::Null);
        Ok(serde_json::from_value(data)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Items
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch one item with the given column texts.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    #[instrument(skip(self, token))]
    pub async fn item(
        &self,
        item_id: &str,
        columns: &[String],
        token: &Secret,
    ) -> BoardResult<Option<BoardItem>> {
        let data = self
            .execute::<ItemsQuery>(
                &ItemsVariables {
                    ids: vec![item_id.to_string()],
                    columns: columns.to_vec(),
                },
                token,
            )
            .await?;
        Ok(data.items.into_iter().find(|item| item.id == item_id))
    }

    /// Set a column to a simple value.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    #[instrument(skip(self, value, token))]
    pub async fn change_column_value(
        &self,
        board_id: &str,
        item_id: &str,
        column_id: &str,
        value: &str,
        token: &Secret,
    ) -> BoardResult<()> {
        let data = self
            .execute::<ChangeColumnValue>(
                &ChangeColumnVariables {
                    board_id: board_id.to_string(),
                    item_id: item_id.to_string(),
                    column_id: column_id.to_string(),
                    value: value.to_string(),
                },
                token,
            )
            .await?;
        let item = data
            .change_simple_column_value
            .ok_or(BoardError::MissingEntity(ChangeColumnValue::OPERATION_NAME))?;
        debug!(item_id = %item.id, "Column value changed");
        Ok(())
    }

    /// Post an update on an item.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    #[instrument(skip(self, body, token))]
    pub async fn create_update(&self, item_id: &str, body: &str, token: &Secret) -> BoardResult<()> {
        let data = self
            .execute::<CreateUpdate>(
                &CreateUpdateVariables {
                    item_id: item_id.to_string(),
                    body: body.to_string(),
                },
                token,
            )
            .await?;
        let update = data
            .create_update
            .ok_or(BoardError::MissingEntity(CreateUpdate::OPERATION_NAME))?;
        debug!(update_id = %update.id, "Update posted");
        Ok(())
    }
}

fn parse_error_response(status: StatusCode, bytes: &[u8]) -> BoardError {
    let body = serde_json::from_slice::<Value>(bytes).ok();
    let message = body
        .as_ref()
        .and_then(|b| b.get("error_message").or_else(|| b.get("message")))
        .and_then(Value::as_str)
        .map_or_else(
            || {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            },
            ToString::to_string,
        );

    BoardError::Api {
        status: status.as_u16(),
        message,
        body,
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path},
    };

    use super::*;

    fn client(server: &MockServer) -> BoardApiClient {
        BoardApiClient::new(&BoardConfig::default())
            .unwrap()
            .with_base_url(format!("{}/v2", server.uri()))
    }

    #[tokio::test]
    async fn test_item_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2"))
            .and(header("authorization", "Bearer board-token"))
            .and(body_partial_json(serde_json::json!({
                "variables": {"ids": ["123"], "columns": ["job_number"]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"items": [{
                    "id": "123",
                    "state": "active",
                    "column_values": [{"id": "job_number", "text": "HH-900"}]
                }]}
            })))
            .mount(&server)
            .await;

        let item = client(&server)
            .item("123", &["job_number".to_string()], &Secret::new("board-token"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.column_text("job_number"), Some("HH-900"));
    }

    #[tokio::test]
    async fn test_errors_array_on_200_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": null,
                "errors": [{"message": "Column not found"}]
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .change_column_value("1", "123", "date", "2024-06-01", &Secret::new("t"))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::Graphql { operation: "change_simple_column_value", .. }));
    }

    #[tokio::test]
    async fn test_column_change_returns_item() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "variables": {"board_id": "1", "item_id": "123", "column_id": "date", "value": "2024-06-01"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"change_simple_column_value": {"id": "123"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .change_column_value("1", "123", "date", "2024-06-01", &Secret::new("t"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_null_mutation_result_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"create_update": null}
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .create_update("123", "hello", &Secret::new("t"))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::MissingEntity("create_update")));
        assert!(!err.is_retryable());

        let adapter = err.into_adapter_error();
        assert!(!adapter.is_transport());
        assert!(!adapter.is_retryable());
    }

    #[tokio::test]
    async fn test_flat_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error_message": "User unauthorized to perform action",
                "status_code": 403
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .create_update("123", "hello", &Secret::new("t"))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::Api { ref message, .. } if message.contains("unauthorized")));
    }

    #[tokio::test]
    async fn test_rate_limited_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error_message": "Complexity budget exhausted"
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .item("123", &[], &Secret::new("t"))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
