use crate::state_store::StateStore;
use crate::swap_metrics::SWAP_STORE_ERRORS_TOTAL;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sled::{Batch, Db};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use swap_types::StoreError;
use tracing::error;

const SWAP_STATE_TREE_NAME: &str = "swap_state";

/// A [`StateStore`] backed by a sled tree.
#[derive(Clone)] // sled::Db and sled::Tree are Arc internally
pub struct SledStateStore {
    db: Db,
    tree: sled::Tree,
    closed: Arc<AtomicBool>,
}

impl SledStateStore {
    /// Opens or creates a sled database at `path`.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let db = sled::open(path).context("Failed to open Sled database for swap state")?;
        let tree = db
            .open_tree(SWAP_STATE_TREE_NAME)
            .context("Failed to open swap_state tree in Sled database")?;
        Ok(Self {
            db,
            tree,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn backend_error(operation: &str, key: &str, e: sled::Error) -> StoreError {
        SWAP_STORE_ERRORS_TOTAL.with_label_values(&[operation]).inc();
        error!(key, error = %e, "Sled {} failed", operation);
        StoreError::Backend(e.to_string())
    }
}

#[async_trait]
impl StateStore for SledStateStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.ensure_open()?;
        match self.tree.get(key.as_bytes()) {
            Ok(Some(ivec)) => Ok(ivec.to_vec()),
            Ok(None) => Err(StoreError::NotFound(key.to_string())),
            Err(e) => Err(Self::backend_error("get", key, e)),
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.tree
            .insert(key.as_bytes(), value)
            .map(|_| ())
            .map_err(|e| Self::backend_error("put", key, e))
    }

    async fn put_batch(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StoreError> {
        self.ensure_open()?;
        let first_key = entries.first().map(|(k, _)| k.clone()).unwrap_or_default();
        let mut batch = Batch::default();
        for (key, value) in entries {
            batch.insert(key.as_bytes(), value);
        }
        self.tree
            .apply_batch(batch)
            .map_err(|e| Self::backend_error("put_batch", &first_key, e))
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.ensure_open()?;
        let mut keys = Vec::new();
        for item in self.tree.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item.map_err(|e| Self::backend_error("keys", prefix, e))?;
            match String::from_utf8(key.to_vec()) {
                Ok(k) => keys.push(k),
                Err(e) => {
                    // Not written by us; skipped
                    SWAP_STORE_ERRORS_TOTAL.with_label_values(&["keys_utf8"]).inc();
                    error!(error = %e, "Non UTF-8 key in swap_state tree");
                }
            }
        }
        Ok(keys)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::SeqCst);
        self.db
            .flush_async()
            .await
            .map(|_| ())
            .map_err(|e| Self::backend_error("close", "", e))
    }
}
