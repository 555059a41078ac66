//! External collaborator contracts for Factline
//!
//! Object storage, queues, the vector index, the embedding and chat
//! backends, and document layout analysis are all external, swappable
//! services. This crate defines the narrow traits the pipelines consume,
//! an explicitly constructed [`ClientRegistry`] injected into workers at
//! startup, and in-memory implementations backing tests and dev mode.

pub mod analysis;
pub mod index;
pub mod llm;
pub mod queue;
pub mod registry;
pub mod storage;

pub use analysis::{AnalyzedPage, DocumentAnalyzer, PlainTextAnalyzer};
pub use index::{MemoryVectorIndex, VectorIndex};
pub use llm::{ChatClient, EchoChatClient, EmbeddingClient, HashEmbeddingClient, ScriptedChatClient};
pub use queue::{MemoryQueue, QueueClient};
pub use registry::ClientRegistry;
pub use storage::{BlobProperties, MemoryObjectStore, ObjectStore};

/// Error types for adapter operations
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Chat completion error: {0}")]
    Chat(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AdapterError>;
