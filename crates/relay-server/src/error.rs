//! HTTP error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use relay_core::SyncError;
use relay_webhook::WebhookError;
use serde_json::{Value, json};

/// An error answered to the webhook sender as `{error, kind, details?}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
    details: Option<Value>,
}

impl ApiError {
    /// Non-POST on a webhook route.
    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            kind: "method_not_allowed",
            message: "method not allowed".to_string(),
            details: None,
        }
    }

    /// Unknown path.
    #[must_use]
    pub fn not_found(path: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            kind: "not_found",
            message: format!("not found: {path}"),
            details: None,
        }
    }

    /// Whole-request deadline exceeded.
    #[must_use]
    pub fn timed_out() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            kind: "timeout",
            message: "request timed out".to_string(),
            details: None,
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Response body.
    #[must_use]
    pub fn body(&self) -> Value {
        let mut body = json!({
            "error": self.message,
            "kind": self.kind,
        });
        if let (Some(details), Value::Object(map)) = (&self.details, &mut body) {
            map.insert("details".to_string(), details.clone());
        }
        body
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        Self {
            status: StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            kind: err.error_kind(),
            details: err.details(),
            message: err.to_string(),
        }
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        SyncError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use relay_core::{AdapterError, ResolutionCause};

    use super::*;

    #[test]
    fn test_webhook_errors_map_to_taxonomy() {
        let err = ApiError::from(WebhookError::InvalidSignature);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body()["kind"], "authentication_failure");

        let err = ApiError::from(WebhookError::InvalidPayload("no event".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body()["kind"], "malformed_payload");

        let err = ApiError::from(WebhookError::ProviderNotConfigured("board webhook secret".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body()["kind"], "not_configured");
    }

    #[test]
    fn test_details_carry_remote_payload() {
        let err = ApiError::from(SyncError::ExternalWrite {
            reference: "HH-900".into(),
            error: AdapterError::application("job_ledger", Some(422), "unknown field")
                .with_raw(json!({"error": "unknown field"})),
        });

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = err.body();
        assert_eq!(body["kind"], "external_write_failure");
        assert_eq!(body["details"]["remote"]["error"], "unknown field");
    }

    #[test]
    fn test_not_found_reference_has_no_remote() {
        let err = ApiError::from(SyncError::ReferenceResolution {
            reference: "123".into(),
            cause: ResolutionCause::NotFound {
                system: "project_board",
            },
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body()["details"]["found"], false);
    }

    #[test]
    fn test_plain_errors_omit_details() {
        let body = ApiError::method_not_allowed().body();
        assert_eq!(body, json!({"error": "method not allowed", "kind": "method_not_allowed"}));
    }
}
