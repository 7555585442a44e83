//! In-process doubles for the relay's external seams.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use relay_core::{
    AdapterError, AdapterResult, IdempotencyKey, IdempotencyStore, InMemoryIdempotencyStore,
    LockState, RecordSystem, Secret, StoreError,
};

/// One call made against a [`FakeRecordSystem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ResolveReference { own_id: String },
    ReadLockState { foreign_id: String },
    WriteField {
        foreign_id: String,
        field: String,
        value: String,
    },
    WriteNote { foreign_id: String, text: String },
}

/// Operation selector for injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ResolveReference,
    ReadLockState,
    WriteField,
    WriteNote,
}

impl Call {
    const fn operation(&self) -> Operation {
        match self {
            Self::ResolveReference { .. } => Operation::ResolveReference,
            Self::ReadLockState { .. } => Operation::ReadLockState,
            Self::WriteField { .. } => Operation::WriteField,
            Self::WriteNote { .. } => Operation::WriteNote,
        }
    }
}

#[derive(Default)]
struct FakeState {
    references: HashMap<String, String>,
    locks: HashMap<String, LockState>,
    failures: HashMap<Operation, AdapterError>,
    calls: Vec<Call>,
}

/// A [`RecordSystem`] that records every call and answers from a script.
///
/// Unknown references resolve to `None`; records without a scripted lock
/// state read as [`LockState::Unlocked`].
#[derive(Clone)]
pub struct FakeRecordSystem {
    name: &'static str,
    required_token: Option<String>,
    delay: Option<Duration>,
    state: Arc<Mutex<FakeState>>,
}

impl FakeRecordSystem {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            required_token: None,
            delay: None,
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    /// Map `own_id` to `foreign_id` for `resolve_reference`.
    #[must_use]
    pub fn with_reference(self, own_id: &str, foreign_id: &str) -> Self {
        self.state
            .lock()
            .references
            .insert(own_id.to_string(), foreign_id.to_string());
        self
    }

    /// Script the lock state of a record.
    #[must_use]
    pub fn with_lock(self, foreign_id: &str, lock: LockState) -> Self {
        self.state.lock().locks.insert(foreign_id.to_string(), lock);
        self
    }

    /// Make every call of `operation` fail with `error`.
    #[must_use]
    pub fn failing(self, operation: Operation, error: AdapterError) -> Self {
        self.state.lock().failures.insert(operation, error);
        self
    }

    /// Reject calls whose credential differs from `token`.
    #[must_use]
    pub fn with_required_token(mut self, token: &str) -> Self {
        self.required_token = Some(token.to_string());
        self
    }

    /// Sleep before answering each call.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every call so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Number of calls of one kind.
    #[must_use]
    pub fn count(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    #[must_use]
    pub fn write_count(&self) -> usize {
        self.count(Operation::WriteField)
    }

    /// `(foreign_id, field, value)` of every field write.
    #[must_use]
    pub fn writes(&self) -> Vec<(String, String, String)> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::WriteField {
                    foreign_id,
                    field,
                    value,
                } => Some((foreign_id.clone(), field.clone(), value.clone())),
                _ => None,
            })
            .collect()
    }

    async fn enter(&self, call: Call, credential: &Secret) -> AdapterResult<()> {
        let operation = call.operation();
        self.state.lock().calls.push(call);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(required) = &self.required_token {
            if credential.expose() != required {
                return Err(AdapterError::application(
                    self.name,
                    Some(401),
                    "invalid credentials",
                ));
            }
        }
        let failure = self.state.lock().failures.get(&operation).cloned();
        failure.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for FakeRecordSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeRecordSystem")
            .field("name", &self.name)
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RecordSystem for FakeRecordSystem {
    fn system_name(&self) -> &'static str {
        self.name
    }

    async fn resolve_reference(&self, own_id: &str, credential: &Secret) -> AdapterResult<Option<String>> {
        self.enter(
            Call::ResolveReference {
                own_id: own_id.to_string(),
            },
            credential,
        )
        .await?;
        Ok(self.state.lock().references.get(own_id).cloned())
    }

    async fn read_lock_state(&self, foreign_id: &str, credential: &Secret) -> AdapterResult<LockState> {
        self.enter(
            Call::ReadLockState {
                foreign_id: foreign_id.to_string(),
            },
            credential,
        )
        .await?;
        Ok(self
            .state
            .lock()
            .locks
            .get(foreign_id)
            .copied()
            .unwrap_or(LockState::Unlocked))
    }

    async fn write_field(
        &self,
        foreign_id: &str,
        field: &str,
        value: &str,
        credential: &Secret,
    ) -> AdapterResult<()> {
        self.enter(
            Call::WriteField {
                foreign_id: foreign_id.to_string(),
                field: field.to_string(),
                value: value.to_string(),
            },
            credential,
        )
        .await
    }

    async fn write_note(&self, foreign_id: &str, text: &str, credential: &Secret) -> AdapterResult<()> {
        self.enter(
            Call::WriteNote {
                foreign_id: foreign_id.to_string(),
                text: text.to_string(),
            },
            credential,
        )
        .await
    }
}

/// Idempotency store backed by memory, with switchable failures.
#[derive(Debug, Default)]
pub struct ScriptedStore {
    inner: InMemoryIdempotencyStore,
    fail_seen: bool,
    fail_record: bool,
}

impl ScriptedStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `seen` fail.
    #[must_use]
    pub const fn failing_seen(mut self) -> Self {
        self.fail_seen = true;
        self
    }

    /// Make `record` fail.
    #[must_use]
    pub const fn failing_record(mut self) -> Self {
        self.fail_record = true;
        self
    }

    /// Markers currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl IdempotencyStore for ScriptedStore {
    async fn seen(&self, key: &IdempotencyKey) -> Result<bool, StoreError> {
        if self.fail_seen {
            return Err(StoreError::Unavailable("scripted seen failure".into()));
        }
        self.inner.seen(key).await
    }

    async fn record(&self, key: &IdempotencyKey) -> Result<(), StoreError> {
        if self.fail_record {
            return Err(StoreError::Unavailable("scripted record failure".into()));
        }
        self.inner.record(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_records_calls_in_order() {
        let fake = FakeRecordSystem::new("ledger")
            .with_reference("123", "HH-900")
            .with_lock("HH-901", LockState::Locked);
        let token = Secret::new("t");

        assert_eq!(
            fake.resolve_reference("123", &token).await.unwrap().as_deref(),
            Some("HH-900")
        );
        assert_eq!(fake.resolve_reference("999", &token).await.unwrap(), None);
        assert_eq!(
            fake.read_lock_state("HH-901", &token).await.unwrap(),
            LockState::Locked
        );
        fake.write_field("HH-900", "outgoing_date", "2024-06-01", &token)
            .await
            .unwrap();

        assert_eq!(fake.call_count(), 4);
        assert_eq!(fake.count(Operation::ResolveReference), 2);
        assert_eq!(
            fake.writes(),
            vec![("HH-900".into(), "outgoing_date".into(), "2024-06-01".into())]
        );
    }

    #[tokio::test]
    async fn test_fake_injected_failure_and_token_check() {
        let fake = FakeRecordSystem::new("ledger")
            .with_required_token("right")
            .failing(Operation::WriteNote, AdapterError::transport("ledger", "refused"));

        let err = fake
            .read_lock_state("HH-900", &Secret::new("wrong"))
            .await
            .unwrap_err();
        assert!(!err.is_transport());

        let err = fake
            .write_note("HH-900", "hello", &Secret::new("right"))
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert_eq!(fake.call_count(), 2);
    }

    #[tokio::test]
    async fn test_scripted_store_failures() {
        let key = IdempotencyKey::derive(relay_core::SourceSystem::Payments, "t", "i", "v");
        let store = ScriptedStore::new().failing_record();
        assert!(!store.seen(&key).await.unwrap());
        assert!(store.record(&key).await.is_err());

        let store = ScriptedStore::new().failing_seen();
        assert!(store.seen(&key).await.is_err());
    }
}
