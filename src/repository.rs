use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::FailureFilter;
use crate::error::Failure;
use crate::source::{GetSource, StoreSource};

/// A composed read path. The only entry point of the engine's repositories.
#[async_trait]
pub trait Repository<K, V>: Send + Sync {
    async fn get(&self, key: &K) -> Result<V, Failure>;
}

/// A repository that is exactly its primary source, unwrapped.
pub struct SourceRepository<K, V> {
    primary: Arc<dyn GetSource<K, V>>,
}

impl<K, V> SourceRepository<K, V> {
    pub fn new(primary: Arc<dyn GetSource<K, V>>) -> Self {
        SourceRepository { primary }
    }
}

#[async_trait]
impl<K, V> Repository<K, V> for SourceRepository<K, V>
where
    K: Send + Sync,
    V: Send,
{
    async fn get(&self, key: &K) -> Result<V, Failure> {
        self.primary.get(key).await
    }
}

/// A read-only view of the store, unwrapped.
pub struct StoreRepository<K, V> {
    store: Arc<dyn StoreSource<K, V>>,
}

impl<K, V> StoreRepository<K, V> {
    pub fn new(store: Arc<dyn StoreSource<K, V>>) -> Self {
        StoreRepository { store }
    }
}

#[async_trait]
impl<K, V> Repository<K, V> for StoreRepository<K, V>
where
    K: Send + Sync,
    V: Send,
{
    async fn get(&self, key: &K) -> Result<V, Failure> {
        self.store.get(key).await
    }
}

/// Reads the primary, persists into the store, and falls back to the store
/// on classified primary failures.
///
/// The persist is best effort: its failure never masks a successful primary
/// read, except an `Unhandled` persist failure, which is surfaced. When a
/// fallback read fails too, the caller sees the *primary's* original
/// failure, never the store's, unless the store raised `Unhandled`.
pub struct PrimarySyncRepository<K, V> {
    primary: Arc<dyn GetSource<K, V>>,
    store: Arc<dyn StoreSource<K, V>>,
    fallbacks: FailureFilter,
}

impl<K, V> PrimarySyncRepository<K, V> {
    pub fn new(
        primary: Arc<dyn GetSource<K, V>>,
        store: Arc<dyn StoreSource<K, V>>,
        fallbacks: FailureFilter,
    ) -> Self {
        PrimarySyncRepository {
            primary,
            store,
            fallbacks,
        }
    }
}

#[async_trait]
impl<K, V> Repository<K, V> for PrimarySyncRepository<K, V>
where
    K: Debug + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<V, Failure> {
        let primary_failure = match self.primary.get(key).await {
            Ok(value) => {
                return match self.store.put(key, Some(value.clone())).await {
                    Ok(_) => Ok(value),
                    Err(Failure::Unhandled(cause)) => Err(Failure::Unhandled(cause)),
                    Err(failure) => {
                        tracing::warn!(?key, %failure, "persist after primary read failed");
                        Ok(value)
                    }
                };
            }
            Err(failure) => failure,
        };

        if !self.fallbacks.matches(&primary_failure) {
            return Err(primary_failure);
        }

        tracing::debug!(?key, failure = %primary_failure, "primary failed, falling back to store");
        match self.store.get(key).await {
            Ok(value) => Ok(value),
            Err(Failure::Unhandled(cause)) => Err(Failure::Unhandled(cause)),
            // The store's own failure never replaces the one that triggered
            // the fallback.
            Err(_) => Err(primary_failure),
        }
    }
}

/// Reads the store, delegating to the full primary-sync protocol on
/// classified store failures.
pub struct StoreSyncRepository<K, V> {
    store: Arc<dyn StoreSource<K, V>>,
    primary: Arc<dyn GetSource<K, V>>,
    store_fallbacks: FailureFilter,
    primary_fallbacks: FailureFilter,
}

impl<K, V> StoreSyncRepository<K, V> {
    pub fn new(
        store: Arc<dyn StoreSource<K, V>>,
        primary: Arc<dyn GetSource<K, V>>,
        store_fallbacks: FailureFilter,
        primary_fallbacks: FailureFilter,
    ) -> Self {
        StoreSyncRepository {
            store,
            primary,
            store_fallbacks,
            primary_fallbacks,
        }
    }
}

#[async_trait]
impl<K, V> Repository<K, V> for StoreSyncRepository<K, V>
where
    K: Debug + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<V, Failure> {
        let failure = match self.store.get(key).await {
            Ok(value) => return Ok(value),
            Err(failure) => failure,
        };

        if !self.store_fallbacks.matches(&failure) {
            return Err(failure);
        }

        tracing::debug!(?key, %failure, "store failed, syncing from primary");
        PrimarySyncRepository::new(
            self.primary.clone(),
            self.store.clone(),
            self.primary_fallbacks.clone(),
        )
        .get(key)
        .await
    }
}
