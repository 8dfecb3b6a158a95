//! Key-value store contract behind the rate cache, plus an in-process store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::clock::{Clock, SystemClock};

/// Number of entries above which a write also sweeps expired entries.
const SWEEP_THRESHOLD: usize = 1024;

/// Minimum time between two write-triggered sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Errors from a key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend could not serve the request.
    #[error("store backend failed: {0}")]
    Backend(String),

    /// The read was cancelled by the caller.
    #[error("store read cancelled")]
    Cancelled,
}

/// A shared string store with absolute per-entry expiry.
///
/// Expiry is the store's job: once `ttl` has passed since a `set_string`,
/// `get_string` for that key returns `None`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if present and not expired.
    async fn get_string(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, expiring `ttl` from now. Overwrites any previous value.
    async fn set_string(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Instant,
}

impl StoredValue {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Thread-safe in-process store with lazy expiry.
pub struct MemoryStore {
    entries: DashMap<String, StoredValue>,
    clock: Arc<dyn Clock>,
    next_sweep: Mutex<Instant>,
}

impl MemoryStore {
    /// Create an empty store on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let next_sweep = Mutex::new(clock.now());
        Self {
            entries: DashMap::new(),
            clock,
            next_sweep,
        }
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry.
    pub fn evict_expired(&self) {
        let now = self.clock.now();
        self.entries.retain(|_, entry| entry.is_live(now));
    }
}

impl MemoryStore {
    /// Whether a write may sweep now; at most one sweep per [`SWEEP_INTERVAL`].
    fn claim_sweep(&self) -> bool {
        let now = self.clock.now();
        let mut next_sweep = self.next_sweep.lock();
        if now < *next_sweep {
            return false;
        }
        *next_sweep = now + SWEEP_INTERVAL;
        true
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_string(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let now = self.clock.now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                return Ok(Some(entry.value.clone()));
            }
        }

        // Only remove if still expired; a concurrent writer may have refreshed it.
        if self
            .entries
            .remove_if(key, |_, entry| !entry.is_live(now))
            .is_some()
        {
            trace!(key = key, "Removed expired entry");
        }
        Ok(None)
    }

    async fn set_string(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        if self.entries.len() >= SWEEP_THRESHOLD && self.claim_sweep() {
            self.evict_expired();
        }

        let expires_at = self.clock.now() + ttl;
        self.entries
            .insert(key.to_string(), StoredValue { value, expires_at });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn store_with_clock() -> (MemoryStore, ManualClock) {
        let clock = ManualClock::new();
        (MemoryStore::with_clock(Arc::new(clock.clone())), clock)
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let store = MemoryStore::new();
        let value = store.get_string("EUR:GBP", &CancellationToken::new()).await;
        assert_eq!(value, Ok(None));
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (store, _clock) = store_with_clock();
        let cancel = CancellationToken::new();

        store
            .set_string("EUR:GBP", "0.9".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(
            store.get_string("EUR:GBP", &cancel).await,
            Ok(Some("0.9".to_string()))
        );
    }

    #[tokio::test]
    async fn test_entry_expires_at_ttl() {
        let (store, clock) = store_with_clock();
        let cancel = CancellationToken::new();

        store
            .set_string("EUR:GBP", "0.9".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        clock.advance(Duration::from_secs(59));
        assert!(store.get_string("EUR:GBP", &cancel).await.unwrap().is_some());

        clock.advance(Duration::from_secs(1));
        assert_eq!(store.get_string("EUR:GBP", &cancel).await, Ok(None));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_resets_expiry() {
        let (store, clock) = store_with_clock();
        let cancel = CancellationToken::new();
        let ttl = Duration::from_secs(60);

        store.set_string("k", "1".to_string(), ttl).await.unwrap();
        clock.advance(Duration::from_secs(50));
        store.set_string("k", "2".to_string(), ttl).await.unwrap();
        clock.advance(Duration::from_secs(50));

        assert_eq!(
            store.get_string("k", &cancel).await,
            Ok(Some("2".to_string()))
        );
    }

    #[tokio::test]
    async fn test_cancelled_read() {
        let store = MemoryStore::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(
            store.get_string("k", &cancel).await,
            Err(StoreError::Cancelled)
        );
    }

    #[tokio::test]
    async fn test_evict_expired_keeps_live_entries() {
        let (store, clock) = store_with_clock();

        store
            .set_string("short", "1".to_string(), Duration::from_secs(10))
            .await
            .unwrap();
        store
            .set_string("long", "2".to_string(), Duration::from_secs(120))
            .await
            .unwrap();

        clock.advance(Duration::from_secs(30));
        store.evict_expired();

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get_string("long", &CancellationToken::new()).await,
            Ok(Some("2".to_string()))
        );
    }

    #[tokio::test]
    async fn test_write_sweeps_when_large() {
        let (store, clock) = store_with_clock();

        for i in 0..SWEEP_THRESHOLD {
            store
                .set_string(&format!("k{i}"), "1".to_string(), Duration::from_secs(1))
                .await
                .unwrap();
        }
        clock.advance(Duration::from_secs(2));

        store
            .set_string("fresh", "1".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_write_sweeps_at_most_once_per_interval() {
        let (store, clock) = store_with_clock();
        let short = Duration::from_millis(100);
        let long = Duration::from_secs(60);

        for i in 0..SWEEP_THRESHOLD {
            store.set_string(&format!("a{i}"), "1".to_string(), short).await.unwrap();
        }
        clock.advance(Duration::from_millis(200));
        store.set_string("x", "1".to_string(), long).await.unwrap();
        assert_eq!(store.len(), 1);

        for i in 0..SWEEP_THRESHOLD {
            store.set_string(&format!("b{i}"), "1".to_string(), short).await.unwrap();
        }
        clock.advance(Duration::from_millis(200));
        store.set_string("y", "1".to_string(), long).await.unwrap();
        assert_eq!(store.len(), SWEEP_THRESHOLD + 2);

        clock.advance(SWEEP_INTERVAL);
        store.set_string("z", "1".to_string(), long).await.unwrap();
        assert_eq!(store.len(), 3);
    }
}
