//! Injectable client registry
//!
//! One explicitly constructed bundle of external clients, built at startup
//! and passed to the pipeline workers. Replaces process-wide singleton
//! client caches so tests can substitute fakes per instance.

use std::sync::Arc;

use crate::analysis::{DocumentAnalyzer, PlainTextAnalyzer};
use crate::index::{MemoryVectorIndex, VectorIndex};
use crate::llm::{ChatClient, EchoChatClient, EmbeddingClient, HashEmbeddingClient};
use crate::queue::{MemoryQueue, QueueClient};
use crate::storage::{MemoryObjectStore, ObjectStore};

/// The external clients a pipeline worker needs.
#[derive(Clone)]
pub struct ClientRegistry {
    pub object_store: Arc<dyn ObjectStore>,
    pub queue: Arc<dyn QueueClient>,
    pub index: Arc<dyn VectorIndex>,
    pub embeddings: Arc<dyn EmbeddingClient>,
    pub chat: Arc<dyn ChatClient>,
    pub analyzer: Arc<dyn DocumentAnalyzer>,
}

impl ClientRegistry {
    pub fn new(
        object_store: Arc<dyn ObjectStore>,
        queue: Arc<dyn QueueClient>,
        index: Arc<dyn VectorIndex>,
        embeddings: Arc<dyn EmbeddingClient>,
        chat: Arc<dyn ChatClient>,
        analyzer: Arc<dyn DocumentAnalyzer>,
    ) -> Self {
        Self {
            object_store,
            queue,
            index,
            embeddings,
            chat,
            analyzer,
        }
    }

    /// All-in-memory registry for tests and dev mode, sharing the given
    /// queue so a worker loop can drain what the services enqueue.
    pub fn in_memory(queue: Arc<MemoryQueue>, dimension: usize) -> Self {
        Self {
            object_store: Arc::new(MemoryObjectStore::new()),
            queue,
            index: Arc::new(MemoryVectorIndex::new(dimension)),
            embeddings: Arc::new(HashEmbeddingClient::new(dimension)),
            chat: Arc::new(EchoChatClient::new()),
            analyzer: Arc::new(PlainTextAnalyzer::new()),
        }
    }

    pub fn with_chat(mut self, chat: Arc<dyn ChatClient>) -> Self {
        self.chat = chat;
        self
    }

    pub fn with_embeddings(mut self, embeddings: Arc<dyn EmbeddingClient>) -> Self {
        self.embeddings = embeddings;
        self
    }

    pub fn with_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = index;
        self
    }
}
