use std::fmt::Debug;
use std::sync::{Arc, OnceLock};

use tokio::sync::Mutex;

use crate::clock::DISTANT_PAST;
use crate::error::Failure;
use crate::source::CacheSource;
use crate::stores::memory::MemoryStore;

/// Identity of an expiration record.
///
/// The type tag disambiguates values of different semantic types cached
/// under colliding keys; it is consulted only by the registry, never by the
/// value store itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryId {
    pub key: String,
    pub type_tag: &'static str,
}

impl EntryId {
    /// Identity for `key` holding a value of type `V`.
    pub fn of<V, K: Debug>(key: &K) -> Self {
        EntryId {
            key: format!("{:?}", key),
            type_tag: std::any::type_name::<V>(),
        }
    }
}

/// Key-value store specialized to hold `EntryId -> expiration instant`
/// (unix-epoch milliseconds).
///
/// Every operation takes an internal mutex so registry sequences serialize
/// against concurrent users of the same instance; the backing store's own IO
/// interleaves with the value store's and must not lose updates.
pub struct ExpirationRegistry {
    lock: Mutex<()>,
    store: Box<dyn CacheSource<EntryId, i64>>,
}

impl ExpirationRegistry {
    /// A registry backed by a fresh in-memory store.
    pub fn new() -> Self {
        Self::with_store(Box::new(MemoryStore::new()))
    }

    /// A registry backed by a caller-supplied store (e.g. an embedded
    /// database table or a [`crate::JsonFileStore`]).
    pub fn with_store(store: Box<dyn CacheSource<EntryId, i64>>) -> Self {
        ExpirationRegistry {
            lock: Mutex::new(()),
            store,
        }
    }

    /// The process-local registry shared by every `After`-policy store that
    /// was not given an explicit one.
    pub fn shared() -> Arc<ExpirationRegistry> {
        static SHARED: OnceLock<Arc<ExpirationRegistry>> = OnceLock::new();
        SHARED
            .get_or_init(|| Arc::new(ExpirationRegistry::new()))
            .clone()
    }

    /// The recorded expiration instant for `id`, or `NotFound`.
    pub async fn expires_at(&self, id: &EntryId) -> Result<i64, Failure> {
        let _guard = self.lock.lock().await;
        self.store.get(id).await
    }

    /// Record (or overwrite) the expiration instant for `id`.
    pub async fn record(&self, id: &EntryId, expires_at_ms: i64) -> Result<i64, Failure> {
        let _guard = self.lock.lock().await;
        self.store.put(id, Some(expires_at_ms)).await
    }

    /// Remove the record for `id`; removing an absent record succeeds.
    pub async fn remove(&self, id: &EntryId) -> Result<(), Failure> {
        let _guard = self.lock.lock().await;
        self.store.delete(id).await
    }

    /// Force the next freshness check for `id` to see an already-expired
    /// record.
    pub async fn invalidate(&self, id: &EntryId) -> Result<(), Failure> {
        self.record(id, DISTANT_PAST).await.map(|_| ())
    }
}

impl Default for ExpirationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_read_back() {
        let registry = ExpirationRegistry::new();
        let id = EntryId::of::<String, _>(&42);

        assert_eq!(
            registry.expires_at(&id).await.unwrap_err(),
            Failure::NotFound
        );

        registry.record(&id, 1_000).await.unwrap();
        assert_eq!(registry.expires_at(&id).await.unwrap(), 1_000);

        // Overwrite
        registry.record(&id, 2_000).await.unwrap();
        assert_eq!(registry.expires_at(&id).await.unwrap(), 2_000);

        registry.remove(&id).await.unwrap();
        assert_eq!(
            registry.expires_at(&id).await.unwrap_err(),
            Failure::NotFound
        );
    }

    #[tokio::test]
    async fn test_invalidate_writes_distant_past() {
        let registry = ExpirationRegistry::new();
        let id = EntryId::of::<String, _>(&"user:1");

        registry.record(&id, i64::MAX).await.unwrap();
        registry.invalidate(&id).await.unwrap();
        assert_eq!(registry.expires_at(&id).await.unwrap(), DISTANT_PAST);
    }

    #[tokio::test]
    async fn test_type_tag_disambiguates_colliding_keys() {
        let registry = ExpirationRegistry::new();
        let as_string = EntryId::of::<String, _>(&0);
        let as_number = EntryId::of::<u64, _>(&0);
        assert_ne!(as_string, as_number);

        registry.record(&as_string, 10).await.unwrap();
        assert_eq!(
            registry.expires_at(&as_number).await.unwrap_err(),
            Failure::NotFound
        );
    }
}
