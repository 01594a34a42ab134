use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;
use crate::error::Failure;
use crate::expiry::{Expiration, ExpiringStore};
use crate::registry::EntryId;
use crate::repository::{
    PrimarySyncRepository, Repository, SourceRepository, StoreRepository, StoreSyncRepository,
};
use crate::source::{GetSource, StoreSource};

/// The caller-selected read mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Read straight from the primary source.
    Primary,
    /// Read straight from the store.
    Store,
    /// Read the primary, persist into the store, fall back to the store.
    PrimarySync,
    /// Read the store, fall back to the full primary-sync protocol.
    StoreSync,
}

/// Operation-indexed strategy over a primary source and a store.
///
/// Building repositories performs no IO; [`CacheStrategy::repository`] is a
/// pure composition step, safe to call repeatedly and concurrently.
///
/// ```ignore
/// let strategy = CacheStrategy::builder(primary, store)
///     .expires_after(Duration::from_secs(60))
///     .build();
///
/// let user = strategy.get(Operation::StoreSync, &"user:1").await?;
/// ```
pub struct CacheStrategy<K, V> {
    primary: Arc<dyn GetSource<K, V>>,
    store: Arc<dyn StoreSource<K, V>>,
    config: CacheConfig,
}

impl<K, V> CacheStrategy<K, V>
where
    K: Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// A strategy with no expiration policy and the default configuration.
    pub fn new(primary: Arc<dyn GetSource<K, V>>, store: Arc<dyn StoreSource<K, V>>) -> Self {
        Self::builder(primary, store).build()
    }

    pub fn builder(
        primary: Arc<dyn GetSource<K, V>>,
        store: Arc<dyn StoreSource<K, V>>,
    ) -> StrategyBuilder<K, V> {
        StrategyBuilder {
            primary,
            store,
            expiration: Expiration::Never,
            config: CacheConfig::default(),
        }
    }

    /// Compose the concrete repository for `operation`.
    pub fn repository(&self, operation: Operation) -> Box<dyn Repository<K, V>> {
        match operation {
            Operation::Primary => Box::new(SourceRepository::new(self.primary.clone())),
            Operation::Store => Box::new(StoreRepository::new(self.store.clone())),
            Operation::PrimarySync => Box::new(PrimarySyncRepository::new(
                self.primary.clone(),
                self.store.clone(),
                self.config.primary_fallbacks.clone(),
            )),
            Operation::StoreSync => Box::new(StoreSyncRepository::new(
                self.store.clone(),
                self.primary.clone(),
                self.config.store_fallbacks.clone(),
                self.config.primary_fallbacks.clone(),
            )),
        }
    }

    /// Read `key` under `operation`.
    pub async fn get(&self, operation: Operation, key: &K) -> Result<V, Failure> {
        self.repository(operation).get(key).await
    }

    /// Mark `key` expired so the next `After`-policy read takes the expired
    /// branch. Independent of the read path; no raw delete is issued. Only
    /// `After`-policy stores consult the registry, so under `Never` (or
    /// `Always`) this records the mark but does not change what reads see.
    pub async fn invalidate(&self, key: &K) -> Result<(), Failure> {
        self.config.registry.invalidate(&EntryId::of::<V, K>(key)).await
    }

    /// Invalidate `key` and force a refresh through the primary-sync
    /// protocol.
    pub async fn refresh(&self, key: &K) -> Result<V, Failure> {
        self.invalidate(key).await?;
        self.get(Operation::PrimarySync, key).await
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

/// Explicit builder for [`CacheStrategy`].
pub struct StrategyBuilder<K, V> {
    primary: Arc<dyn GetSource<K, V>>,
    store: Arc<dyn StoreSource<K, V>>,
    expiration: Expiration,
    config: CacheConfig,
}

impl<K, V> StrategyBuilder<K, V>
where
    K: Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Attach an expiration policy to the store.
    pub fn expires(mut self, expiration: Expiration) -> Self {
        self.expiration = expiration;
        self
    }

    /// Shorthand for `expires(Expiration::After(duration))`.
    pub fn expires_after(self, duration: Duration) -> Self {
        self.expires(Expiration::After(duration))
    }

    /// Replace the default configuration.
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> CacheStrategy<K, V> {
        let store: Arc<dyn StoreSource<K, V>> = match self.expiration {
            // Never is a pass-through; skip the decorator entirely.
            Expiration::Never => self.store,
            policy => Arc::new(ExpiringStore::new(self.store, policy, &self.config)),
        };
        CacheStrategy {
            primary: self.primary,
            store,
            config: self.config,
        }
    }
}

/// The default-configuration primary-sync repository over a pair of sources.
pub fn fallback_with<K, V>(
    primary: Arc<dyn GetSource<K, V>>,
    store: Arc<dyn StoreSource<K, V>>,
) -> PrimarySyncRepository<K, V>
where
    K: Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    PrimarySyncRepository::new(
        primary,
        store,
        CacheConfig::default().primary_fallbacks,
    )
}
