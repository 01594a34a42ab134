//! Concurrency decorators for data sources.
//!
//! Any source can be wrapped to cap its in-flight calls
//! ([`ParallelismLimiter`]) or to serialize them completely ([`Mutexed`]).
//! Both implement whichever of the get/put/delete traits the inner source
//! implements.

use async_trait::async_trait;
use tokio::sync::{Mutex, Semaphore};

use crate::error::Failure;
use crate::source::{DeleteSource, GetSource, PutSource};

/// Caps the number of concurrently in-flight calls to the inner source,
/// queuing excess callers. Used to bound load on costly primaries.
pub struct ParallelismLimiter<S> {
    inner: S,
    semaphore: Semaphore,
}

impl<S> ParallelismLimiter<S> {
    pub fn new(inner: S, limit: usize) -> Self {
        ParallelismLimiter {
            inner,
            semaphore: Semaphore::new(limit),
        }
    }

    async fn permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>, Failure> {
        self.semaphore.acquire().await.map_err(Failure::unhandled)
    }
}

#[async_trait]
impl<K, V, S> GetSource<K, V> for ParallelismLimiter<S>
where
    K: Sync,
    V: Send,
    S: GetSource<K, V>,
{
    async fn get(&self, key: &K) -> Result<V, Failure> {
        let _permit = self.permit().await?;
        self.inner.get(key).await
    }
}

#[async_trait]
impl<K, V, S> PutSource<K, V> for ParallelismLimiter<S>
where
    K: Sync,
    V: Send + 'static,
    S: PutSource<K, V>,
{
    async fn put(&self, key: &K, value: Option<V>) -> Result<V, Failure> {
        let _permit = self.permit().await?;
        self.inner.put(key, value).await
    }
}

#[async_trait]
impl<K, S> DeleteSource<K> for ParallelismLimiter<S>
where
    K: Sync,
    S: DeleteSource<K>,
{
    async fn delete(&self, key: &K) -> Result<(), Failure> {
        let _permit = self.permit().await?;
        self.inner.delete(key).await
    }
}

/// Fully serializes calls to the inner source: at most one in flight at a
/// time. Useful when the source memoizes a naturally singular resource, such
/// as a lazily-opened database handle.
pub struct Mutexed<S> {
    inner: S,
    lock: Mutex<()>,
}

impl<S> Mutexed<S> {
    pub fn new(inner: S) -> Self {
        Mutexed {
            inner,
            lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl<K, V, S> GetSource<K, V> for Mutexed<S>
where
    K: Sync,
    V: Send,
    S: GetSource<K, V>,
{
    async fn get(&self, key: &K) -> Result<V, Failure> {
        let _guard = self.lock.lock().await;
        self.inner.get(key).await
    }
}

#[async_trait]
impl<K, V, S> PutSource<K, V> for Mutexed<S>
where
    K: Sync,
    V: Send + 'static,
    S: PutSource<K, V>,
{
    async fn put(&self, key: &K, value: Option<V>) -> Result<V, Failure> {
        let _guard = self.lock.lock().await;
        self.inner.put(key, value).await
    }
}

#[async_trait]
impl<K, S> DeleteSource<K> for Mutexed<S>
where
    K: Sync,
    S: DeleteSource<K>,
{
    async fn delete(&self, key: &K) -> Result<(), Failure> {
        let _guard = self.lock.lock().await;
        self.inner.delete(key).await
    }
}
