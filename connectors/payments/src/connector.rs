//! [`RecordSystem`] implementation for the payment processor.
//!
//! Own identifiers are checkout session ids; foreign identifiers are
//! payment intent ids. Fields and notes land in the intent's metadata.

use async_trait::async_trait;
use relay_core::{AdapterResult, LockState, RecordSystem, Secret};
use tracing::debug;

use crate::{PaymentsApiClient, PaymentsConfig, PaymentsError, PaymentsResult, SYSTEM_NAME};

/// Payments adapter.
#[derive(Debug, Clone)]
pub struct Payments {
    client: PaymentsApiClient,
    note_key: String,
}

impl Payments {
    /// Build the adapter from configuration.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: &PaymentsConfig) -> PaymentsResult<Self> {
        Ok(Self {
            client: PaymentsApiClient::new(config)?,
            note_key: config.note_key.clone(),
        })
    }

    /// Point the adapter at another base URL (for testing).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client = self.client.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl RecordSystem for Payments {
    fn system_name(&self) -> &'static str {
        SYSTEM_NAME
    }

    async fn resolve_reference(&self, own_id: &str, credential: &Secret) -> AdapterResult<Option<String>> {
        let session = self
            .client
            .checkout_session(own_id, credential)
            .await
            .map_err(PaymentsError::into_adapter_error)?;
        Ok(session.and_then(|s| s.job_id().map(str::to_string)))
    }

    async fn read_lock_state(&self, foreign_id: &str, credential: &Secret) -> AdapterResult<LockState> {
        let intent = self
            .client
            .payment_intent(foreign_id, credential)
            .await
            .map_err(PaymentsError::into_adapter_error)?;

        Ok(match intent {
            None => LockState::NotFound,
            Some(intent) if intent.is_locked() => {
                debug!(intent = %intent.id, status = %intent.status, "Payment intent is locked");
                LockState::Locked
            }
            Some(_) => LockState::Unlocked,
        })
    }

    async fn write_field(
        &self,
        foreign_id: &str,
        field: &str,
        value: &str,
        credential: &Secret,
    ) -> AdapterResult<()> {
        self.client
            .update_metadata(foreign_id, field, value, credential)
            .await
            .map(drop)
            .map_err(PaymentsError::into_adapter_error)
    }

    async fn write_note(&self, foreign_id: &str, text: &str, credential: &Secret) -> AdapterResult<()> {
        self.client
            .update_metadata(foreign_id, &self.note_key, text, credential)
            .await
            .map(drop)
            .map_err(PaymentsError::into_adapter_error)
    }
}

#[cfg(test)]
mod tests {
    use relay_testkit::MockApiServer;
    use serde_json::json;

    use super::*;

    fn payments(server: &MockApiServer) -> Payments {
        Payments::new(&PaymentsConfig::default())
            .unwrap()
            .with_base_url(server.base_url())
    }

    #[tokio::test]
    async fn test_resolve_reference() {
        let server = MockApiServer::start().await;
        server
            .expect_get(
                "/v1/checkout/sessions/cs_1",
                json!({"id": "cs_1", "metadata": {"job_id": "HH-900"}}),
            )
            .await;
        server
            .expect_get("/v1/checkout/sessions/cs_bare", json!({"id": "cs_bare"}))
            .await;

        let payments = payments(&server);
        let key = Secret::new("sk_test");
        assert_eq!(
            payments.resolve_reference("cs_1", &key).await.unwrap().as_deref(),
            Some("HH-900")
        );
        assert_eq!(payments.resolve_reference("cs_bare", &key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lock_states() {
        let server = MockApiServer::start().await;
        server
            .expect_get("/v1/payment_intents/pi_ok", json!({"id": "pi_ok", "status": "succeeded"}))
            .await;
        server
            .expect_get("/v1/payment_intents/pi_void", json!({"id": "pi_void", "status": "canceled"}))
            .await;
        server
            .expect_get(
                "/v1/payment_intents/pi_frozen",
                json!({"id": "pi_frozen", "status": "succeeded", "metadata": {"locked": "true"}}),
            )
            .await;
        server
            .expect_error("/v1/payment_intents/pi_gone", 404, json!({"error": {"message": "missing"}}))
            .await;

        let payments = payments(&server);
        let key = Secret::new("sk_test");
        assert_eq!(payments.read_lock_state("pi_ok", &key).await.unwrap(), LockState::Unlocked);
        assert_eq!(payments.read_lock_state("pi_void", &key).await.unwrap(), LockState::Locked);
        assert_eq!(payments.read_lock_state("pi_frozen", &key).await.unwrap(), LockState::Locked);
        assert_eq!(payments.read_lock_state("pi_gone", &key).await.unwrap(), LockState::NotFound);
    }

    #[tokio::test]
    async fn test_write_note_uses_note_key() {
        let server = MockApiServer::start().await;
        server
            .expect_post(
                "/v1/payment_intents/pi_1",
                json!({"id": "pi_1", "status": "succeeded", "metadata": {"sync_note": "Recorded"}}),
            )
            .await;

        payments(&server)
            .write_note("pi_1", "Recorded against job HH-900.", &Secret::new("sk_test"))
            .await
            .unwrap();

        let requests = server.received_requests().await;
        assert_eq!(requests.len(), 1);
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.starts_with("metadata%5Bsync_note%5D="));
    }

    #[tokio::test]
    async fn test_rejected_write_is_application_error() {
        let server = MockApiServer::start().await;
        server
            .expect_error(
                "/v1/payment_intents/pi_1",
                400,
                json!({"error": {"message": "Invalid metadata", "type": "invalid_request_error"}}),
            )
            .await;

        let err = payments(&server)
            .write_field("pi_1", "amount_paid", "250.00", &Secret::new("sk_test"))
            .await
            .unwrap_err();
        assert!(!err.is_transport());
        assert_eq!(err.diagnostic()["error"]["message"], "Invalid metadata");
    }
}
