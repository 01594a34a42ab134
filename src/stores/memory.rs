use std::collections::HashMap;
use std::hash::Hash;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Failure;
use crate::source::{DeleteSource, GetSource, PutSource};

/// Thread-safe in-memory store using a HashMap behind an RwLock.
///
/// Single-key reads, writes and deletes are atomic under concurrent access;
/// no atomicity is promised across keys. Suitable for tests, process-local
/// caches and as the default backing of the expiration registry. For
/// high-concurrency production workloads prefer [`crate::MokaStore`].
pub struct MemoryStore<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    state: RwLock<HashMap<K, V>>,
}

impl<K, V> MemoryStore<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        MemoryStore {
            state: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store pre-populated with `initial` entries.
    pub fn with_initial(initial: impl IntoIterator<Item = (K, V)>) -> Self {
        MemoryStore {
            state: RwLock::new(initial.into_iter().collect()),
        }
    }
}

impl<K, V> Default for MemoryStore<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, V> GetSource<K, V> for MemoryStore<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<V, Failure> {
        let state = self.state.read().await;
        state.get(key).cloned().ok_or(Failure::NotFound)
    }
}

#[async_trait]
impl<K, V> PutSource<K, V> for MemoryStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn put(&self, key: &K, value: Option<V>) -> Result<V, Failure> {
        let value = value.ok_or(Failure::Empty)?;
        let mut state = self.state.write().await;
        state.insert(key.clone(), value.clone());
        Ok(value)
    }
}

#[async_trait]
impl<K, V> DeleteSource<K> for MemoryStore<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn delete(&self, key: &K) -> Result<(), Failure> {
        let mut state = self.state.write().await;
        state.remove(key);
        Ok(())
    }
}
