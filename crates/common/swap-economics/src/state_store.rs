use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use swap_types::StoreError;
use tokio::sync::RwLock;

/// Durable key/value state backing the ledger.
///
/// `get` must report a missing key as [`StoreError::NotFound`] so callers can
/// tell "never written" apart from a failing backend. After `close` every
/// other operation fails with [`StoreError::Closed`].
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;
    /// Write all `entries` or none of them.
    async fn put_batch(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StoreError>;
    /// Every key starting with `prefix`.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
    async fn close(&self) -> Result<(), StoreError>;
}

/// Read and bincode-decode the value under `key`.
pub async fn get_decoded<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &str,
) -> Result<T, StoreError> {
    let bytes = store.get(key).await?;
    bincode::deserialize(&bytes).map_err(|e| StoreError::Codec {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Bincode-encode `value` and write it under `key`.
pub async fn put_encoded<T: Serialize + ?Sized>(
    store: &dyn StateStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let bytes = bincode::serialize(value).map_err(|e| StoreError::Codec {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.put(key, bytes).await
}

/// Bincode-encode `value` into a `(key, bytes)` pair for [`StateStore::put_batch`].
pub fn encode_entry<T: Serialize + ?Sized>(
    key: String,
    value: &T,
) -> Result<(String, Vec<u8>), StoreError> {
    match bincode::serialize(value) {
        Ok(bytes) => Ok((key, bytes)),
        Err(e) => Err(StoreError::Codec {
            reason: e.to_string(),
            key,
        }),
    }
}

/// Map-backed store for tests and ephemeral nodes.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
    closed: AtomicBool,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.ensure_open()?;
        self.entries
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn put_batch(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.entries.write().await.extend(entries);
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.ensure_open()?;
        let entries = self.entries.read().await;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
