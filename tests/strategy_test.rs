//! Integration tests for the operation-indexed strategy: expiration,
//! fallback classification and invalidation working together.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sync_cache::{
    get_source, CacheConfig, CacheStrategy, Failure, GetSource, JsonFileStore,
    JsonFileStoreConfig, ManualClock, MemoryStore, NetworkFailure, Operation,
    ExpirationRegistry, PutSource,
};

// ============================================================================
// Test Types
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

// ============================================================================
// Helpers
// ============================================================================

fn manual_config() -> (CacheConfig, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let config = CacheConfig {
        registry: Arc::new(ExpirationRegistry::new()),
        clock: clock.clone(),
        ..CacheConfig::default()
    };
    (config, clock)
}

fn constant_primary(value: &str) -> Arc<dyn GetSource<i32, String>> {
    let value = value.to_string();
    Arc::new(get_source(move |_: i32| {
        let value = value.clone();
        async move { Ok(value) }
    }))
}

fn failing_primary(failure: Failure) -> Arc<dyn GetSource<i32, String>> {
    Arc::new(get_source(move |_: i32| {
        let failure = failure.clone();
        async move { Err::<String, _>(failure) }
    }))
}

/// Store whose get always raises the given failure; puts go nowhere.
struct BrokenStore {
    on_get: Failure,
}

#[async_trait]
impl GetSource<i32, String> for BrokenStore {
    async fn get(&self, _key: &i32) -> Result<String, Failure> {
        Err(self.on_get.clone())
    }
}

#[async_trait]
impl PutSource<i32, String> for BrokenStore {
    async fn put(&self, _key: &i32, value: Option<String>) -> Result<String, Failure> {
        value.ok_or(Failure::Empty)
    }
}

// ============================================================================
// Expiration end to end
// ============================================================================

#[tokio::test]
async fn test_primary_sync_then_store_until_expiry() {
    let (config, clock) = manual_config();
    let strategy = CacheStrategy::builder(
        constant_primary("main"),
        Arc::new(MemoryStore::<i32, String>::new()),
    )
    .expires_after(Duration::from_millis(50))
    .config(config)
    .build();

    // Sync from the primary; the value is stored as a side effect.
    assert_eq!(
        strategy.get(Operation::PrimarySync, &0).await.unwrap(),
        "main"
    );

    // Immediately readable straight from the store.
    assert_eq!(strategy.get(Operation::Store, &0).await.unwrap(), "main");

    // Past the deadline the stored value is expired.
    clock.advance(Duration::from_millis(100));
    assert_eq!(
        strategy.get(Operation::Store, &0).await.unwrap_err(),
        Failure::Invalid
    );
}

#[tokio::test]
async fn test_store_sync_refreshes_after_expiry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    let primary = Arc::new(get_source(move |_: i32| {
        let calls = calls_clone.clone();
        async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("main #{}", n))
        }
    }));

    let (config, clock) = manual_config();
    let strategy = CacheStrategy::builder(primary, Arc::new(MemoryStore::new()))
        .expires_after(Duration::from_millis(50))
        .config(config)
        .build();

    // Miss: loads from the primary and stores.
    assert_eq!(
        strategy.get(Operation::StoreSync, &0).await.unwrap(),
        "main #1"
    );
    // Fresh: served from the store, primary untouched.
    assert_eq!(
        strategy.get(Operation::StoreSync, &0).await.unwrap(),
        "main #1"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Expired: the store fails Invalid, which is classified, so the full
    // primary-sync protocol runs again.
    clock.advance(Duration::from_millis(60));
    assert_eq!(
        strategy.get(Operation::StoreSync, &0).await.unwrap(),
        "main #2"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_fail_closed_when_registry_has_no_record() {
    let (config, _clock) = manual_config();
    // The store already holds a value, but no expiration record exists.
    let strategy = CacheStrategy::builder(
        constant_primary("main"),
        Arc::new(MemoryStore::with_initial([(0, "orphan".to_string())])),
    )
    .expires_after(Duration::from_secs(3_600))
    .config(config)
    .build();

    assert_eq!(
        strategy.get(Operation::Store, &0).await.unwrap_err(),
        Failure::Invalid
    );
}

#[tokio::test]
async fn test_invalidation_expires_regardless_of_freshness() {
    let (config, _clock) = manual_config();
    let strategy = CacheStrategy::builder(
        constant_primary("main"),
        Arc::new(MemoryStore::<i32, String>::new()),
    )
    .expires_after(Duration::from_secs(3_600))
    .config(config)
    .build();

    strategy.get(Operation::PrimarySync, &0).await.unwrap();
    assert_eq!(strategy.get(Operation::Store, &0).await.unwrap(), "main");

    strategy.invalidate(&0).await.unwrap();
    assert_eq!(
        strategy.get(Operation::Store, &0).await.unwrap_err(),
        Failure::Invalid
    );

    // A refresh repopulates.
    assert_eq!(strategy.refresh(&0).await.unwrap(), "main");
    assert_eq!(strategy.get(Operation::Store, &0).await.unwrap(), "main");
}

// ============================================================================
// Fallback classification
// ============================================================================

#[tokio::test]
async fn test_offline_primary_falls_back_to_stored_value() {
    let store = Arc::new(MemoryStore::with_initial([(0, "stored".to_string())]));
    let strategy = CacheStrategy::new(
        failing_primary(NetworkFailure::NoConnection.into()),
        store,
    );

    assert_eq!(
        strategy.get(Operation::PrimarySync, &0).await.unwrap(),
        "stored"
    );
}

#[tokio::test]
async fn test_store_sync_matches_primary_sync_on_classified_failure() {
    // An empty store fails NotFound, which is classified for both
    // directions; StoreSync must produce what PrimarySync produces.
    let primary = constant_primary("main");
    let store = Arc::new(MemoryStore::<i32, String>::new());
    let strategy = CacheStrategy::new(primary.clone(), store.clone());

    let via_store_sync = strategy.get(Operation::StoreSync, &0).await;
    let via_primary_sync = strategy.get(Operation::PrimarySync, &1).await;
    assert_eq!(via_store_sync.unwrap(), via_primary_sync.unwrap());
}

#[tokio::test]
async fn test_original_primary_failure_survives_store_miss() {
    let server_error: Failure = NetworkFailure::ServerError.into();
    let strategy = CacheStrategy::new(
        failing_primary(server_error.clone()),
        Arc::new(MemoryStore::<i32, String>::new()),
    );

    // Store misses with NotFound; the caller still sees the server error.
    assert_eq!(
        strategy.get(Operation::PrimarySync, &0).await.unwrap_err(),
        server_error
    );
}

#[tokio::test]
async fn test_store_unhandled_propagates_through_store_sync() {
    let unhandled = Failure::unhandled(std::io::Error::other("corrupt page"));
    let strategy = CacheStrategy::new(
        constant_primary("main"),
        Arc::new(BrokenStore {
            on_get: unhandled.clone(),
        }),
    );

    // Never substituted by a primary read.
    assert_eq!(
        strategy.get(Operation::StoreSync, &0).await.unwrap_err(),
        unhandled
    );
}

// ============================================================================
// Persistent store backend
// ============================================================================

#[tokio::test]
async fn test_strategy_over_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<JsonFileStore<u64, User>> = Arc::new(
        JsonFileStore::open(JsonFileStoreConfig {
            path: dir.path().join("users.json"),
        })
        .await
        .unwrap(),
    );

    let primary = Arc::new(get_source(|id: u64| async move {
        Ok(User {
            id,
            name: format!("user-{}", id),
        })
    }));

    let strategy = CacheStrategy::new(primary, store.clone());

    let user = strategy.get(Operation::StoreSync, &7).await.unwrap();
    assert_eq!(user.name, "user-7");

    // Persisted through the file store; a reopened store still sees it.
    drop(strategy);
    let reopened: JsonFileStore<u64, User> = JsonFileStore::open(JsonFileStoreConfig {
        path: dir.path().join("users.json"),
    })
    .await
    .unwrap();
    assert_eq!(reopened.get(&7).await.unwrap(), user);
}
