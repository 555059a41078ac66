//! HTTP surface for the Factline pipeline
//!
//! Thin request/response shaping over the ingestion and answer services;
//! all pipeline semantics live in those crates.

pub mod error;
pub mod handlers;
pub mod router;

pub use error::ApiError;
pub use router::create_router;

use std::sync::Arc;

use factline_answer::AnswerService;
use factline_ingestion::IngestionService;
use factline_ledger::StatusLedger;

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub ingestion: Arc<IngestionService>,
    pub answer: Arc<AnswerService>,
    pub ledger: StatusLedger,
}

impl AppState {
    pub fn new(
        ingestion: Arc<IngestionService>,
        answer: Arc<AnswerService>,
        ledger: StatusLedger,
    ) -> Self {
        Self {
            ingestion,
            answer,
            ledger,
        }
    }
}
