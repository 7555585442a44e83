//! Idempotency markers.
//!
//! Webhook senders redeliver on any non-2xx answer (and sometimes on 2xx).
//! The orchestrator checks a marker before the authoritative write and records
//! it after a successful write; the marker store itself lives behind
//! [`IdempotencyStore`] so deployments can plug in a shared store.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use crate::SourceSystem;

/// Default time a marker is remembered.
pub const DEFAULT_IDEMPOTENCY_TTL: Duration = Duration::from_secs(86_400); // 24 hours

/// Key identifying one logical state change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Derive the key for `(source, event_type, item, value)`.
    ///
    /// Parts are length-prefixed before hashing so `("ab", "c")` and
    /// `("a", "bc")` never collide.
    #[must_use]
    pub fn derive(source: SourceSystem, event_type: &str, item_id: &str, new_value: &str) -> Self {
        let mut hasher = Sha256::new();
        for part in [source.as_str(), event_type, item_id, new_value] {
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part.as_bytes());
        }
        Self(format!("idem:{}", hex::encode(hasher.finalize())))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Marker store failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or answered with an error.
    #[error("idempotency store unavailable: {0}")]
    Unavailable(String),
}

/// External marker store.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Whether the marker has already been recorded.
    async fn seen(&self, key: &IdempotencyKey) -> Result<bool, StoreError>;

    /// Record the marker.
    async fn record(&self, key: &IdempotencyKey) -> Result<(), StoreError>;
}

/// Process-local marker store with TTL expiry.
///
/// Only safe for single-instance deployments; replicas need a shared store.
#[derive(Debug)]
pub struct InMemoryIdempotencyStore {
    ttl: Duration,
    seen: RwLock<HashMap<IdempotencyKey, DateTime<Utc>>>,
}

impl InMemoryIdempotencyStore {
    /// Create a store with the default TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_IDEMPOTENCY_TTL)
    }

    /// Create a store with a custom TTL.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            seen: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live markers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cleanup();
        self.seen.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cleanup(&self) {
        let now = Utc::now();
        // Saturate instead of panicking on absurd TTLs
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::TimeDelta::MAX);
        self.seen.write().retain(|_, at| now - *at < ttl);
    }
}

impl Default for InMemoryIdempotencyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn seen(&self, key: &IdempotencyKey) -> Result<bool, StoreError> {
        self.cleanup();
        Ok(self.seen.read().contains_key(key))
    }

    async fn record(&self, key: &IdempotencyKey) -> Result<(), StoreError> {
        self.seen.write().insert(key.clone(), Utc::now());
        Ok(())
    }
}
