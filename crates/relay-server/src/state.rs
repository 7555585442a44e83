//! Shared handler state.

use std::{sync::Arc, time::Duration};

use relay_core::{InMemoryIdempotencyStore, Secret};
use relay_jobledger::JobLedger;
use relay_payments::Payments;
use relay_projectboard::ProjectBoard;
use relay_sync::{SyncDeps, SyncOrchestrator};
use relay_webhook::WebhookRouter;

use crate::{ConfigError, RelayConfig};

/// Everything a webhook handler needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<WebhookRouter>,
    pub orchestrator: Arc<SyncOrchestrator>,
    pub token_secret: Arc<Secret>,
    pub request_timeout: Duration,
    pub redact_fields: Arc<Vec<String>>,
}

impl AppState {
    /// Assemble state from parts.
    #[must_use]
    pub fn new(router: WebhookRouter, orchestrator: SyncOrchestrator, token_secret: Secret) -> Self {
        Self {
            router: Arc::new(router),
            orchestrator: Arc::new(orchestrator),
            token_secret: Arc::new(token_secret),
            request_timeout: Duration::from_secs(30),
            redact_fields: Arc::new(relay_telemetry::TelemetryConfig::default().redact_fields),
        }
    }

    /// Whole-request deadline.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Build production state: HTTP adapters and an in-memory idempotency store.
    ///
    /// # Errors
    ///
    /// An adapter's HTTP client could not be built.
    pub fn from_config(config: &RelayConfig) -> Result<Self, ConfigError> {
        let board = ProjectBoard::new(&config.board).map_err(|e| ConfigError::Adapter {
            system: relay_projectboard::SYSTEM_NAME,
            message: e.to_string(),
        })?;
        let ledger = JobLedger::new(&config.ledger).map_err(|e| ConfigError::Adapter {
            system: relay_jobledger::SYSTEM_NAME,
            message: e.to_string(),
        })?;
        let payments = Payments::new(&config.payments).map_err(|e| ConfigError::Adapter {
            system: relay_payments::SYSTEM_NAME,
            message: e.to_string(),
        })?;

        let orchestrator = SyncOrchestrator::new(SyncDeps {
            board: Arc::new(board),
            ledger: Arc::new(ledger),
            payments: Arc::new(payments),
            store: Arc::new(InMemoryIdempotencyStore::with_ttl(config.sync.idempotency_ttl)),
            credentials: config.credentials.clone(),
            fields: config.sync.fields.clone(),
        })
        .with_call_timeout(config.sync.call_timeout);

        let router = WebhookRouter::new(config.router_config())
            .with_payments_secret(config.secrets.payments_webhook_secret.clone())
            .with_board_secret(config.secrets.board_webhook_secret.clone());

        let mut state = Self::new(router, orchestrator, config.secrets.token_secret.clone())
            .with_request_timeout(config.server.request_timeout);
        state.redact_fields = Arc::new(config.logging.redact_fields.clone());
        Ok(state)
    }
}
