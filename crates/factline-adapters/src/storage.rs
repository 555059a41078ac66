//! Object storage contract
//!
//! Blobs carry content bytes plus a flat string metadata map; the ingestion
//! pipeline reads the required document identifier out of that map.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{AdapterError, Result};

/// Blob metadata as seen at validation time.
#[derive(Debug, Clone, Default)]
pub struct BlobProperties {
    pub metadata: HashMap<String, String>,
    pub content_length: usize,
}

/// Narrow get/put contract over blob storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, name: &str, content: Vec<u8>, metadata: HashMap<String, String>)
        -> Result<()>;

    async fn get(&self, name: &str) -> Result<Vec<u8>>;

    /// Properties lookup without fetching content; `BlobNotFound` when the
    /// blob never landed.
    async fn head(&self, name: &str) -> Result<BlobProperties>;
}

#[derive(Clone, Default)]
struct StoredBlob {
    content: Vec<u8>,
    metadata: HashMap<String, String>,
}

/// In-memory object store for tests and dev mode.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    blobs: Arc<RwLock<HashMap<String, StoredBlob>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        name: &str,
        content: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        debug!(blob = %name, bytes = content.len(), "Storing blob");
        self.blobs
            .write()
            .await
            .insert(name.to_string(), StoredBlob { content, metadata });
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(name)
            .map(|b| b.content.clone())
            .ok_or_else(|| AdapterError::BlobNotFound(name.to_string()))
    }

    async fn head(&self, name: &str) -> Result<BlobProperties> {
        self.blobs
            .read()
            .await
            .get(name)
            .map(|b| BlobProperties {
                metadata: b.metadata.clone(),
                content_length: b.content.len(),
            })
            .ok_or_else(|| AdapterError::BlobNotFound(name.to_string()))
    }
}
