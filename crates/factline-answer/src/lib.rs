//! Answer generation pipeline for Factline
//!
//! Drives a user query from submission through filtered retrieval, chat
//! completion, and citation formatting to a terminal ledger state, with a
//! synchronous inline path and a pollable asynchronous path.

pub mod service;

pub use service::{
    AnswerRequest, AnswerService, PollResponse, SubmitReceipt, SyncAnswer,
};

use factline_core::StageError;
use factline_ledger::LedgerError;

/// Error types for answer operations
#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transaction already in progress: {0}")]
    Duplicate(String),

    #[error("Unknown transaction: {0}")]
    NotFound(String),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("Ledger error: {0}")]
    Ledger(LedgerError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<LedgerError> for AnswerError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Duplicate(identity) => Self::Duplicate(identity),
            LedgerError::NotFound(identity) => Self::NotFound(identity),
            other => Self::Ledger(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnswerError>;
