//! Document ingestion pipeline for Factline
//!
//! Drives a document from upload initiation through metadata validation,
//! layout analysis, chunking, embedding enrichment, and index upload to a
//! terminal ledger state, using insert-if-absent entry writes to prevent
//! duplicate pipeline starts and upsert transitions for idempotent replay.

pub mod chunking;
pub mod embedding;
pub mod service;

pub use chunking::PageChunker;
pub use embedding::EmbeddingEnricher;
pub use service::{IngestionService, UploadReceipt, UploadRequest};

use factline_core::StageError;
use factline_ledger::LedgerError;

/// Error types for ingestion operations
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Document already in progress: {0}")]
    Duplicate(String),

    #[error("Unknown document: {0}")]
    NotFound(String),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("Ledger error: {0}")]
    Ledger(LedgerError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<LedgerError> for IngestionError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Duplicate(identity) => Self::Duplicate(identity),
            LedgerError::NotFound(identity) => Self::NotFound(identity),
            other => Self::Ledger(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_ledger_error_maps_to_conflict() {
        let err = IngestionError::from(LedgerError::Duplicate("doc-1".to_string()));
        assert!(matches!(err, IngestionError::Duplicate(_)));
    }
}
