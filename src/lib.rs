//! sync-cache - a resilient cache/fallback repository engine
//!
//! This library provides time-bounded access to values produced by a
//! primary source (e.g. a remote call) and persisted into a secondary
//! store (e.g. a local cache):
//! - Four access operations: primary, store, primary-sync, store-sync
//! - Expiration policies (never / always / after a duration) backed by an
//!   expiration registry
//! - Failure-classification-driven fallback between primary and store
//! - Pluggable store backends and concurrency decorators
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use sync_cache::{get_source, CacheStrategy, MemoryStore, Operation};
//!
//! #[tokio::main]
//! async fn main() {
//!     let primary = Arc::new(get_source(|id: u64| async move {
//!         // Load from the network
//!         Ok(format!("user {}", id))
//!     }));
//!     let store = Arc::new(MemoryStore::new());
//!
//!     let strategy = CacheStrategy::builder(primary, store)
//!         .expires_after(Duration::from_secs(60))
//!         .build();
//!
//!     // Serve from the store while fresh, sync from the primary otherwise.
//!     let user = strategy.get(Operation::StoreSync, &123).await.unwrap();
//!     assert_eq!(user, "user 123");
//! }
//! ```

mod clock;
mod concurrency;
mod config;
mod error;
mod expiry;
mod registry;
mod repository;
mod source;
pub mod stores;
mod strategy;

// Re-export public API
pub use clock::{Clock, ManualClock, SystemClock, DISTANT_PAST};
pub use concurrency::{Mutexed, ParallelismLimiter};
pub use config::{CacheConfig, FailureFilter};
pub use error::{from_http_status, Failure, FailureKind, NetworkFailure};
pub use expiry::{Expiration, ExpiringStore};
pub use registry::{EntryId, ExpirationRegistry};
pub use repository::{
    PrimarySyncRepository, Repository, SourceRepository, StoreRepository, StoreSyncRepository,
};
pub use source::{
    get_source, CacheSource, DeleteSource, GetFn, GetSource, PutSource, StoreSource, Validated,
};
pub use stores::file::{JsonFileStore, JsonFileStoreConfig};
pub use stores::memory::MemoryStore;
pub use stores::moka::{MokaStore, MokaStoreConfig};
pub use strategy::{fallback_with, CacheStrategy, Operation, StrategyBuilder};
