//! HTTP error mapping
//!
//! Every error body is `{"errorMessage": "..."}` so callers parse one
//! shape. Validation maps to 400, duplicates to 409, unknown identities
//! to 404, everything else to 500 with the detail kept in the logs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use factline_answer::AnswerError;
use factline_ingestion::IngestionError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "Request failed");
        }

        (status, Json(json!({ "errorMessage": self.to_string() }))).into_response()
    }
}

impl From<IngestionError> for ApiError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::Validation(msg) => Self::Validation(msg),
            IngestionError::Duplicate(identity) => {
                Self::Conflict(format!("Document already in progress: {}", identity))
            }
            IngestionError::NotFound(identity) => {
                Self::NotFound(format!("Unknown document: {}", identity))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AnswerError> for ApiError {
    fn from(err: AnswerError) -> Self {
        match err {
            AnswerError::Validation(msg) => Self::Validation(msg),
            AnswerError::Duplicate(identity) => {
                Self::Conflict(format!("Transaction already in progress: {}", identity))
            }
            AnswerError::NotFound(identity) => {
                Self::NotFound(format!("Unknown transaction: {}", identity))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<factline_ledger::LedgerError> for ApiError {
    fn from(err: factline_ledger::LedgerError) -> Self {
        match err {
            factline_ledger::LedgerError::NotFound(identity) => {
                Self::NotFound(format!("Unknown document: {}", identity))
            }
            factline_ledger::LedgerError::Duplicate(identity) => {
                Self::Conflict(format!("Already exists: {}", identity))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}
