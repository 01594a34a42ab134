use std::hash::Hash;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::error::Failure;
use crate::source::{DeleteSource, GetSource, PutSource};

/// Configuration for [`MokaStore`].
#[derive(Debug, Clone)]
pub struct MokaStoreConfig {
    /// Maximum number of entries the cache can hold.
    pub max_capacity: u64,

    /// Backend-level time to live. `None` means entries are only evicted by
    /// the size limit; freshness is still governed by the engine's
    /// expiration policy, not by this setting.
    pub time_to_live: Option<Duration>,
}

impl Default for MokaStoreConfig {
    fn default() -> Self {
        MokaStoreConfig {
            max_capacity: 10_000,
            time_to_live: None,
        }
    }
}

/// High-performance concurrent store backed by a Moka future cache.
///
/// Lock-free reads and writes with automatic background eviction; the
/// recommended store for high-concurrency workloads.
pub struct MokaStore<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    cache: Cache<K, V>,
}

impl<K, V> MokaStore<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(config: MokaStoreConfig) -> Self {
        let mut builder = Cache::builder().max_capacity(config.max_capacity);
        if let Some(ttl) = config.time_to_live {
            builder = builder.time_to_live(ttl);
        }
        MokaStore {
            cache: builder.build(),
        }
    }
}

#[async_trait]
impl<K, V> GetSource<K, V> for MokaStore<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Result<V, Failure> {
        self.cache.get(key).await.ok_or(Failure::NotFound)
    }
}

#[async_trait]
impl<K, V> PutSource<K, V> for MokaStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn put(&self, key: &K, value: Option<V>) -> Result<V, Failure> {
        let value = value.ok_or(Failure::Empty)?;
        self.cache.insert(key.clone(), value.clone()).await;
        Ok(value)
    }
}

#[async_trait]
impl<K, V> DeleteSource<K> for MokaStore<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn delete(&self, key: &K) -> Result<(), Failure> {
        self.cache.invalidate(key).await;
        Ok(())
    }
}
