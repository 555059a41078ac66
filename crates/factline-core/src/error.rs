use serde::{Deserialize, Serialize};

/// Errors produced by core type construction and validation.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),
}

/// Classification of a pipeline stage failure.
///
/// Determines retry policy: business failures are recorded as terminal
/// ledger states and never redelivered (retry cannot fix bad input), while
/// infrastructure failures are surfaced to the queue runtime so its
/// at-least-once redelivery applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Bad input data; redelivery cannot fix it
    Business,
    /// Transient storage/queue/network failure; redelivery may succeed
    Infrastructure,
}

/// A pipeline stage failure with an explicit retry classification.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct StageError {
    pub kind: FailureKind,
    pub message: String,
}

impl StageError {
    pub fn business(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Business,
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Infrastructure,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == FailureKind::Infrastructure
    }
}
