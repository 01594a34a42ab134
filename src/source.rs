use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::error::Failure;

/// Read side of a data source.
///
/// A primary source (remote call, database) and the get half of a store both
/// implement this. A miss must fail with [`Failure::NotFound`]; unexpected
/// runtime errors must be converted once, at this boundary, with
/// [`Failure::unhandled`].
#[async_trait]
pub trait GetSource<K, V>: Send + Sync {
    async fn get(&self, key: &K) -> Result<V, Failure>;
}

/// Write side of a data source.
///
/// Passing `None` means "no value supplied" and must fail with
/// [`Failure::Empty`], distinct from a miss. On success the stored value is
/// returned.
#[async_trait]
pub trait PutSource<K, V>: Send + Sync {
    async fn put(&self, key: &K, value: Option<V>) -> Result<V, Failure>;
}

/// Delete side of a data source. Deleting an absent key succeeds.
#[async_trait]
pub trait DeleteSource<K>: Send + Sync {
    async fn delete(&self, key: &K) -> Result<(), Failure>;
}

/// A readable and writable store: the secondary side of every strategy.
pub trait StoreSource<K, V>: GetSource<K, V> + PutSource<K, V> {}

impl<T, K, V> StoreSource<K, V> for T where T: GetSource<K, V> + PutSource<K, V> {}

/// A store that also supports deletion; the expiration registry requires one.
pub trait CacheSource<K, V>: StoreSource<K, V> + DeleteSource<K> {}

impl<T, K, V> CacheSource<K, V> for T where T: StoreSource<K, V> + DeleteSource<K> {}

/// A [`GetSource`] backed by an async closure.
///
/// The usual way to adapt a remote call into the engine:
///
/// ```ignore
/// let primary = get_source(|id: u64| async move { client.fetch(id).await });
/// ```
pub struct GetFn<F, K, V> {
    f: F,
    _marker: PhantomData<fn(K) -> V>,
}

/// Build a [`GetSource`] from an async closure receiving an owned key.
pub fn get_source<K, V, F, Fut>(f: F) -> GetFn<F, K, V>
where
    K: Clone + Send + Sync,
    V: Send,
    F: Fn(K) -> Fut + Send + Sync,
    Fut: Future<Output = Result<V, Failure>> + Send,
{
    GetFn {
        f,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<K, V, F, Fut> GetSource<K, V> for GetFn<F, K, V>
where
    K: Clone + Send + Sync,
    V: Send,
    F: Fn(K) -> Fut + Send + Sync,
    Fut: Future<Output = Result<V, Failure>> + Send,
{
    async fn get(&self, key: &K) -> Result<V, Failure> {
        (self.f)(key.clone()).await
    }
}

/// Decorator failing reads with [`Failure::Invalid`] when the value is
/// rejected by a caller-supplied predicate.
pub struct Validated<S, P> {
    inner: S,
    predicate: P,
}

impl<S, P> Validated<S, P> {
    pub fn new(inner: S, predicate: P) -> Self {
        Validated { inner, predicate }
    }
}

#[async_trait]
impl<K, V, S, P> GetSource<K, V> for Validated<S, P>
where
    K: Send + Sync,
    V: Send,
    S: GetSource<K, V>,
    P: Fn(&V) -> bool + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<V, Failure> {
        let value = self.inner.get(key).await?;
        if (self.predicate)(&value) {
            Ok(value)
        } else {
            Err(Failure::Invalid)
        }
    }
}
