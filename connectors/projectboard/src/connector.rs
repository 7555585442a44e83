//! [`RecordSystem`] implementation for the project board.

use async_trait::async_trait;
use relay_core::{AdapterResult, LockState, RecordSystem, Secret};
use tracing::debug;

use crate::{BoardApiClient, BoardConfig, BoardError, BoardResult, SYSTEM_NAME};

/// Project board adapter.
///
/// An item's own id resolves to the ledger job number stored in the
/// configured job column.
#[derive(Debug, Clone)]
pub struct ProjectBoard {
    client: BoardApiClient,
    board_id: Option<String>,
    job_column: String,
    locked_states: Vec<String>,
}

impl ProjectBoard {
    /// Build the adapter from configuration.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: &BoardConfig) -> BoardResult<Self> {
        Ok(Self {
            client: BoardApiClient::new(config)?,
            board_id: config.board_id.clone().filter(|id| !id.trim().is_empty()),
            job_column: config.job_column.clone(),
            locked_states: config.locked_states.clone(),
        })
    }

    /// Point the adapter at another endpoint (for testing).
    #[must_use]
    pub fn with_base_url(mut self, api_url: impl Into<String>) -> Self {
        self.client = self.client.with_base_url(api_url);
        self
    }
}

#[async_trait]
impl RecordSystem for ProjectBoard {
    fn system_name(&self) -> &'static str {
        SYSTEM_NAME
    }

    async fn resolve_reference(&self, own_id: &str, credential: &Secret) -> AdapterResult<Option<String>> {
        let item = self
            .client
            .item(own_id, std::slice::from_ref(&self.job_column), credential)
            .await
            .map_err(BoardError::into_adapter_error)?;

        let job_number = item
            .as_ref()
            .and_then(|item| item.column_text(&self.job_column))
            .map(str::to_string);
        if item.is_some() && job_number.is_none() {
            debug!(item_id = own_id, column = %self.job_column, "Item has no job number");
        }
        Ok(job_number)
    }

    async fn read_lock_state(&self, foreign_id: &str, credential: &Secret) -> AdapterResult<LockState> {
        let item = self
            .client
            .item(foreign_id, &[], credential)
            .await
            .map_err(BoardError::into_adapter_error)?;

        Ok(match item {
            None => LockState::NotFound,
            Some(item) if item.is_locked(&self.locked_states) => LockState::Locked,
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
        let board_id = self
            .board_id
            .as_deref()
            .ok_or_else(|| BoardError::NotConfigured("board_id").into_adapter_error())?;

        self.client
            .change_column_value(board_id, foreign_id, field, value, credential)
            .await
            .map_err(BoardError::into_adapter_error)
    }

    async fn write_note(&self, foreign_id: &str, text: &str, credential: &Secret) -> AdapterResult<()> {
        self.client
            .create_update(foreign_id, text, credential)
            .await
            .map_err(BoardError::into_adapter_error)
    }
}
