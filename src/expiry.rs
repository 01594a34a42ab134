use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::clock::Clock;
use crate::config::CacheConfig;
use crate::error::Failure;
use crate::registry::{EntryId, ExpirationRegistry};
use crate::source::{GetSource, PutSource, StoreSource};

/// When a stored value stops being considered fresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiration {
    /// Stored values never expire.
    Never,
    /// Stored values are never considered fresh; every read fails `Invalid`.
    Always,
    /// Stored values expire the given duration after they were written.
    After(Duration),
}

/// Store decorator enforcing an [`Expiration`] policy through an
/// [`ExpirationRegistry`].
///
/// Reads are fail-closed: a missing or unreadable expiration record means
/// the value is expired, even if the inner store still holds one. Writes
/// under `After` record the expiration instant first and the value second;
/// if the value write then fails the registry keeps a record for a value
/// that was never stored. That inconsistency window is accepted, the next
/// read resolves it through the expired branch.
pub struct ExpiringStore<K, V> {
    inner: Arc<dyn StoreSource<K, V>>,
    policy: Expiration,
    registry: Arc<ExpirationRegistry>,
    clock: Arc<dyn Clock>,
    ignore_expiry: bool,
}

impl<K, V> ExpiringStore<K, V>
where
    K: Debug + Send + Sync,
    V: Send + Sync,
{
    pub fn new(
        inner: Arc<dyn StoreSource<K, V>>,
        policy: Expiration,
        config: &CacheConfig,
    ) -> Self {
        ExpiringStore {
            inner,
            policy,
            registry: config.registry.clone(),
            clock: config.clock.clone(),
            ignore_expiry: config.ignore_expiry,
        }
    }

    async fn get_checked(&self, key: &K) -> Result<V, Failure> {
        let id = EntryId::of::<V, K>(key);
        let now = self.clock.now_ms();

        // A missing or unreadable record counts as expired (fail-closed).
        let valid = self.ignore_expiry
            || match self.registry.expires_at(&id).await {
                Ok(expires_at) => now < expires_at,
                Err(_) => false,
            };

        if !valid {
            self.cleanup(&id).await;
            return Err(Failure::Invalid);
        }

        match self.inner.get(key).await {
            Ok(value) => Ok(value),
            Err(Failure::Unhandled(cause)) => Err(Failure::Unhandled(cause)),
            Err(failure) => {
                tracing::debug!(?id, %failure, "store read failed, dropping expiration record");
                self.cleanup(&id).await;
                Err(Failure::Invalid)
            }
        }
    }

    async fn cleanup(&self, id: &EntryId) {
        // Best effort; an orphaned record only costs one extra expired read.
        if let Err(failure) = self.registry.remove(id).await {
            tracing::warn!(?id, %failure, "expiration record cleanup failed");
        }
    }
}

#[async_trait]
impl<K, V> GetSource<K, V> for ExpiringStore<K, V>
where
    K: Debug + Send + Sync,
    V: Send + Sync,
{
    async fn get(&self, key: &K) -> Result<V, Failure> {
        match &self.policy {
            Expiration::Never => self.inner.get(key).await,
            Expiration::Always => Err(Failure::Invalid),
            Expiration::After(_) => self.get_checked(key).await,
        }
    }
}

#[async_trait]
impl<K, V> PutSource<K, V> for ExpiringStore<K, V>
where
    K: Debug + Send + Sync,
    V: Send + Sync,
{
    async fn put(&self, key: &K, value: Option<V>) -> Result<V, Failure> {
        match &self.policy {
            Expiration::Never => self.inner.put(key, value).await,
            Expiration::Always => {
                let value = value.ok_or(Failure::Empty)?;
                self.inner.put(key, Some(value)).await
            }
            Expiration::After(duration) => {
                let id = EntryId::of::<V, K>(key);
                let expires_at = self
                    .clock
                    .now_ms()
                    .saturating_add(duration.as_millis() as i64);
                // Registry first, value second. Both writes form one logical
                // unit; either failure fails the whole put.
                self.registry.record(&id, expires_at).await?;
                self.inner.put(key, value).await
            }
        }
    }
}
