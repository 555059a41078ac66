//! Status ledger for Factline pipelines
//!
//! A durable key-value record store keyed by a stable identity (document id
//! or transaction id). Creation is insert-if-absent so duplicate pipeline
//! starts are rejected at the entry point; every later transition is an
//! unconditional upsert, which makes transition application idempotent under
//! at-least-once message redelivery.

pub mod memory;
pub mod record;
pub mod store;

pub use memory::MemoryLedger;
pub use record::{LedgerRecord, LedgerUpsert};
pub use store::{LedgerStore, StatusLedger};

/// Error types for ledger operations
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Record already exists for identity: {0}")]
    Duplicate(String),

    #[error("No record for identity: {0}")]
    NotFound(String),

    #[error("Ledger backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LedgerError::Duplicate("doc-1".to_string());
        assert!(err.to_string().contains("doc-1"));
    }
}
