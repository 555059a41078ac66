//! Core types for the Factline document-to-answer pipeline
//!
//! Defines the identifiers, status enumerations, queue message shapes,
//! and chunk entry model shared by every other crate in the workspace,
//! along with application configuration and the stage failure taxonomy.

pub mod config;
pub mod error;
pub mod messages;
pub mod status;
pub mod types;

pub use config::{
    AnswerConfig, ChunkingConfig, EmbeddingConfig, FactlineConfig, PollRenderMode, QueueConfig,
    RetrievalConfig, ServerConfig, StorageConfig,
};
pub use error::{FailureKind, StageError};
pub use messages::{AnswerMessage, IngestionMessage};
pub use status::{AnswerStatus, IngestionStatus};
pub use types::{ChunkedEntry, DocumentId, MetadataPair, TransactionId};
