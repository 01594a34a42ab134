use std::collections::HashMap;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;

use crate::error::Failure;
use crate::source::{DeleteSource, GetSource, PutSource};

/// Configuration for [`JsonFileStore`].
#[derive(Debug, Clone)]
pub struct JsonFileStoreConfig {
    /// Path of the JSON file backing the store. Created on first write.
    pub path: PathBuf,
}

/// Key-value file store persisted as a single JSON document.
///
/// Values are serialized with `serde_json` and the whole map is rewritten on
/// every mutation, so this backend suits small, durable data sets such as
/// user preferences. The in-memory copy is authoritative between writes;
/// reopen the store to pick up external changes.
///
/// Requires `V: Serialize + DeserializeOwned`. Keys are rendered with their
/// `Debug` representation.
pub struct JsonFileStore<K, V>
where
    V: Serialize + DeserializeOwned + Send + Sync,
{
    path: PathBuf,
    state: RwLock<HashMap<String, serde_json::Value>>,
    _marker: PhantomData<fn(K) -> V>,
}

impl<K, V> JsonFileStore<K, V>
where
    K: Debug + Send + Sync,
    V: Serialize + DeserializeOwned + Send + Sync,
{
    /// Open the store, loading the file at `config.path` if it exists.
    pub async fn open(config: JsonFileStoreConfig) -> Result<Self, Failure> {
        let state = match tokio::fs::read(&config.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(Failure::unhandled)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(Failure::unhandled(err)),
        };
        Ok(JsonFileStore {
            path: config.path,
            state: RwLock::new(state),
            _marker: PhantomData,
        })
    }

    async fn persist(&self, state: &HashMap<String, serde_json::Value>) -> Result<(), Failure> {
        let bytes = serde_json::to_vec_pretty(state).map_err(Failure::unhandled)?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(Failure::unhandled)
    }
}

#[async_trait]
impl<K, V> GetSource<K, V> for JsonFileStore<K, V>
where
    K: Debug + Send + Sync,
    V: Serialize + DeserializeOwned + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<V, Failure> {
        let state = self.state.read().await;
        let raw = state.get(&format!("{:?}", key)).ok_or(Failure::NotFound)?;
        // A value that no longer deserializes is stored but unusable.
        serde_json::from_value(raw.clone()).map_err(|_| Failure::Invalid)
    }
}

#[async_trait]
impl<K, V> PutSource<K, V> for JsonFileStore<K, V>
where
    K: Debug + Send + Sync,
    V: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    async fn put(&self, key: &K, value: Option<V>) -> Result<V, Failure> {
        let value = value.ok_or(Failure::Empty)?;
        let raw = serde_json::to_value(&value).map_err(Failure::unhandled)?;
        let mut state = self.state.write().await;
        state.insert(format!("{:?}", key), raw);
        self.persist(&state).await?;
        Ok(value)
    }
}

#[async_trait]
impl<K, V> DeleteSource<K> for JsonFileStore<K, V>
where
    K: Debug + Send + Sync,
    V: Serialize + DeserializeOwned + Send + Sync,
{
    async fn delete(&self, key: &K) -> Result<(), Failure> {
        let mut state = self.state.write().await;
        if state.remove(&format!("{:?}", key)).is_some() {
            self.persist(&state).await?;
        }
        Ok(())
    }
}
