//! Payments REST client.

use relay_core::Secret;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::{
    config::PaymentsConfig,
    error::{PaymentsError, PaymentsResult},
    types::{CheckoutSession, ErrorEnvelope, PaymentIntent, metadata_form},
};

/// Payments REST client. The secret key is passed per call.
#[derive(Debug, Clone)]
pub struct PaymentsApiClient {
    client: Client,
    base_url: String,
}

impl PaymentsApiClient {
    /// Create a new API client from configuration.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: &PaymentsConfig) -> PaymentsResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("relay-payments/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
        })
    }

    /// Set the base URL (for testing).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, segments: &[&str]) -> PaymentsResult<Url> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| PaymentsError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| PaymentsError::Url(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str], key: &Secret) -> PaymentsResult<Option<T>> {
        let url = self.endpoint(segments)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(key.expose())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        handle_response(response).await.map(Some)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Checkout sessions
    // ─────────────────────────────────────────────────────────────────────────

    /// Retrieve a checkout session. `None` when the processor has no such session.
    ///
    /// # Errors
    ///
    /// Transport, status or body-shape failures.
    #[instrument(skip(self, key))]
    pub async fn checkout_session(&self, session_id: &str, key: &Secret) -> PaymentsResult<Option<CheckoutSession>> {
        let session = self.get(&["v1", "checkout", "sessions", session_id], key).await?;
        if session.is_none() {
            debug!(session_id, "Checkout session not found");
        }
        Ok(session)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Payment intents
    // ─────────────────────────────────────────────────────────────────────────

    /// Retrieve a payment intent. `None` when the processor has no such intent.
    ///
    /// # Errors
    ///
    /// Transport, status or body-shape failures.
    #[instrument(skip(self, key))]
    pub async fn payment_intent(&self, intent_id: &str, key: &Secret) -> PaymentsResult<Option<PaymentIntent>> {
        self.get(&["v1", "payment_intents", intent_id], key).await
    }

    /// Set one metadata entry on a payment intent.
    ///
    /// # Errors
    ///
    /// Transport, status or application failures.
    #[instrument(skip(self, value, key))]
    pub async fn update_metadata(
        &self,
        intent_id: &str,
        metadata_key: &str,
        value: &str,
        key: &Secret,
    ) -> PaymentsResult<PaymentIntent> {
        let url = self.endpoint(&["v1", "payment_intents", intent_id])?;
        let response = self
            .client
            .post(url)
            .bearer_auth(key.expose())
            .form(&metadata_form(metadata_key, value))
            .send()
            .await?;

        handle_response(response).await
    }
}

async fn handle_response<T: DeserializeOwned>(response: Response) -> PaymentsResult<T> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        return Err(parse_error_response(status, &bytes));
    }
    Ok(serde_json::from_slice(&bytes)?)
}

fn parse_error_response(status: StatusCode, bytes: &[u8]) -> PaymentsError {
    let body = serde_json::from_slice::<Value>(bytes).ok();
    let envelope = body
        .as_ref()
        .and_then(|b| serde_json::from_value::<ErrorEnvelope>(b.clone()).ok());

    let (message, error_type) = match envelope {
        Some(ErrorEnvelope { error }) => (
            error
                .message
                .or(error.code)
                .unwrap_or_else(|| "Unknown error".to_string()),
            error.error_type,
        ),
        None => (
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
            None,
        ),
    };

    PaymentsError::Api {
        status: status.as_u16(),
        message,
        error_type,
        body,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, header, method, path},
    };

    use super::*;

    async fn client(server: &MockServer) -> PaymentsApiClient {
        PaymentsApiClient::new(&PaymentsConfig::default())
            .unwrap()
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_checkout_session_uses_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_test_1"))
            .and(header("authorization", "Bearer sk_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_1",
                "payment_status": "paid",
                "metadata": {"job_id": "HH-900"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = client(&server)
            .await
            .checkout_session("cs_test_1", &Secret::new("sk_test"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.job_id(), Some("HH-900"));
    }

    #[tokio::test]
    async fn test_missing_intent_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/payment_intents/pi_gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"message": "No such payment_intent", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let intent = client(&server)
            .await
            .payment_intent("pi_gone", &Secret::new("sk_test"))
            .await
            .unwrap();
        assert!(intent.is_none());
    }

    #[tokio::test]
    async fn test_update_metadata_is_form_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents/pi_1"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("metadata%5Bamount_paid%5D=250.00"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pi_1",
                "status": "succeeded",
                "metadata": {"amount_paid": "250.00"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let intent = client(&server)
            .await
            .update_metadata("pi_1", "amount_paid", "250.00", &Secret::new("sk_test"))
            .await
            .unwrap();
        assert_eq!(intent.metadata["amount_paid"], "250.00");
    }

    #[tokio::test]
    async fn test_error_envelope_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents/pi_1"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Invalid API Key provided", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .update_metadata("pi_1", "sync_note", "hello", &Secret::new("sk_wrong"))
            .await
            .unwrap_err();

        match err {
            PaymentsError::Api {
                status,
                message,
                error_type,
                body,
            } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API Key provided");
                assert_eq!(error_type.as_deref(), Some("invalid_request_error"));
                assert!(body.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_error_hides_key() {
        let client = PaymentsApiClient::new(&PaymentsConfig::default())
            .unwrap()
            .with_base_url("http://127.0.0.1:9");

        let err = client
            .payment_intent("pi_1", &Secret::new("sk_live_secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentsError::Http(_)));
        assert!(!err.to_string().contains("sk_live_secret"));
    }
}
