//! Project board GraphQL wire types and operations.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Protocol
// ─────────────────────────────────────────────────────────────────────────────

/// A typed GraphQL operation.
pub trait GraphqlOperation {
    /// Variables type.
    type Variables: Serialize + Send + Sync;
    /// Response data type.
    type ResponseData: DeserializeOwned;

    /// GraphQL query text.
    const QUERY: &'static str;
    /// Operation name, for logs.
    const OPERATION_NAME: &'static str;
}

/// GraphQL request payload.
#[derive(Debug, Serialize)]
pub struct GraphqlRequest<'a, V> {
    pub query: &'static str,
    pub variables: &'a V,
}

/// GraphQL error object. Extra members are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GraphqlError {
    pub message: String,
}

/// GraphQL response container.
#[derive(Debug, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
    /// Some board errors arrive as a flat message instead of `errors`.
    #[serde(default)]
    pub error_message: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Items
// ─────────────────────────────────────────────────────────────────────────────

/// Fetch items with selected column texts.
pub struct ItemsQuery;

#[derive(Debug, Serialize)]
pub struct ItemsVariables {
    pub ids: Vec<String>,
    pub columns: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ItemsData {
    #[serde(default)]
    pub items: Vec<BoardItem>,
}

/// A board item as returned by [`ItemsQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BoardItem {
    pub id: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub column_values: Vec<ColumnText>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnText {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl BoardItem {
    /// Non-empty text of a column.
    #[must_use]
    pub fn column_text(&self, column_id: &str) -> Option<&str> {
        self.column_values
            .iter()
            .find(|column| column.id == column_id)
            .and_then(|column| column.text.as_deref())
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// Whether the item's state is one of `locked_states`.
    #[must_use]
    pub fn is_locked(&self, locked_states: &[String]) -> bool {
        self.state.as_deref().is_some_and(|state| {
            locked_states
                .iter()
                .any(|locked| locked.eq_ignore_ascii_case(state))
        })
    }
}

impl GraphqlOperation for ItemsQuery {
    type Variables = ItemsVariables;
    type ResponseData = ItemsData;

    const QUERY: &'static str = "query ($ids: [ID!], $columns: [String!]) { \
        items (ids: $ids) { id state column_values (ids: $columns) { id text } } }";
    const OPERATION_NAME: &'static str = "items";
}

// ─────────────────────────────────────────────────────────────────────────────
// Mutations
// ─────────────────────────────────────────────────────────────────────────────

/// Set one column to a simple string value.
pub struct ChangeColumnValue;

#[derive(Debug, Serialize)]
pub struct ChangeColumnVariables {
    pub board_id: String,
    pub item_id: String,
    pub column_id: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeColumnData {
    pub change_simple_column_value: Option<EntityRef>,
}

impl GraphqlOperation for ChangeColumnValue {
    type Variables = ChangeColumnVariables;
    type ResponseData = ChangeColumnData;

    const QUERY: &'static str = "mutation ($board_id: ID!, $item_id: ID, $column_id: String!, $value: String) { \
        change_simple_column_value (board_id: $board_id, item_id: $item_id, column_id: $column_id, value: $value) { id } }";
    const OPERATION_NAME: &'static str = "change_simple_column_value";
}

/// Post an update on an item.
pub struct CreateUpdate;

#[derive(Debug, Serialize)]
pub struct CreateUpdateVariables {
    pub item_id: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUpdateData {
    pub create_update: Option<EntityRef>,
}

impl GraphqlOperation for CreateUpdate {
    type Variables = CreateUpdateVariables;
    type ResponseData = CreateUpdateData;

    const QUERY: &'static str =
        "mutation ($item_id: ID, $body: String!) { create_update (item_id: $item_id, body: $body) { id } }";
    const OPERATION_NAME: &'static str = "create_update";
}

/// `{ id }` selection returned by mutations.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityRef {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_item_column_text() {
        let item: BoardItem = serde_json::from_value(json!({
            "id": "123",
            "state": "active",
            "column_values": [
                {"id": "job_number", "text": " HH-900 "},
                {"id": "notes", "text": ""}
            ]
        }))
        .unwrap();

        assert_eq!(item.column_text("job_number"), Some("HH-900"));
        assert_eq!(item.column_text("notes"), None);
        assert_eq!(item.column_text("missing"), None);
        assert!(!item.is_locked(&["archived".into()]));
    }

    #[test]
    fn test_response_with_errors() {
        let response: GraphqlResponse = serde_json::from_value(json!({
            "errors": [{"message": "Column not found", "locations": [{"line": 1, "column": 2}]}],
            "account_id": 1
        }))
        .unwrap();
        assert!(response.data.is_none());
        assert_eq!(response.errors[0].message, "Column not found");
    }

    #[test]
    fn test_request_shape() {
        let variables = CreateUpdateVariables {
            item_id: "123".into(),
            body: "hello".into(),
        };
        let request = GraphqlRequest {
            query: CreateUpdate::QUERY,
            variables: &variables,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["variables"], json!({"item_id": "123", "body": "hello"}));
        assert!(value["query"].as_str().unwrap().contains("create_update"));
    }
}
