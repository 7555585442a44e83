//! [`RecordSystem`] implementation for the job ledger.

use async_trait::async_trait;
use relay_core::{AdapterResult, LockState, RecordSystem, Secret};
use tracing::debug;

use crate::{LedgerApiClient, LedgerConfig, LedgerError, LedgerResult, SYSTEM_NAME};

/// Job ledger adapter.
#[derive(Debug, Clone)]
pub struct JobLedger {
    client: LedgerApiClient,
    locked_statuses: Vec<String>,
}

impl JobLedger {
    /// Build the adapter from configuration.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: &LedgerConfig) -> LedgerResult<Self> {
        Ok(Self {
            client: LedgerApiClient::new(config)?,
            locked_statuses: config.locked_statuses.clone(),
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
impl RecordSystem for JobLedger {
    fn system_name(&self) -> &'static str {
        SYSTEM_NAME
    }

    async fn resolve_reference(&self, own_id: &str, credential: &Secret) -> AdapterResult<Option<String>> {
        let job = self
            .client
            .get_job(own_id, credential)
            .await
            .map_err(LedgerError::into_adapter_error)?;
        Ok(job.map(|job| job.job_number))
    }

    async fn read_lock_state(&self, foreign_id: &str, credential: &Secret) -> AdapterResult<LockState> {
        let job = self
            .client
            .get_job(foreign_id, credential)
            .await
            .map_err(LedgerError::into_adapter_error)?;

        Ok(match job {
            None => LockState::NotFound,
            Some(job) if job.is_locked(&self.locked_statuses) => {
                debug!(job = %job.job_number, status = ?job.status, "Job is locked");
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
            .update_field(foreign_id, field, value, credential)
            .await
            .map_err(LedgerError::into_adapter_error)
    }

    async fn write_note(&self, foreign_id: &str, text: &str, credential: &Secret) -> AdapterResult<()> {
        self.client
            .create_note(foreign_id, text, credential)
            .await
            .map_err(LedgerError::into_adapter_error)
    }
}
