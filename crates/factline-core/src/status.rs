use serde::{Deserialize, Serialize};

/// Status of a document ingestion pipeline instance.
///
/// Transitions only move forward: `AwaitingUpload` → `MetadataValidated` →
/// `IngestionSuccess` on the happy path, with each failure branch terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IngestionStatus {
    /// Upload slot reserved, blob not yet observed
    AwaitingUpload,
    /// Blob landed and required metadata checked out
    MetadataValidated,
    /// Required document-id metadata missing or malformed
    InvalidMetadata,
    /// Blob never landed at the expected location
    BlobNotFound,
    /// Validation succeeded but the ingestion message could not be delivered
    QueueFailed,
    /// All chunks uploaded to the index
    IngestionSuccess,
    /// Analysis, chunking, embedding, or index upload failed
    IngestionFailed,
}

impl IngestionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::AwaitingUpload | Self::MetadataValidated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingUpload => "AWAITING_UPLOAD",
            Self::MetadataValidated => "METADATA_VALIDATED",
            Self::InvalidMetadata => "INVALID_METADATA",
            Self::BlobNotFound => "BLOB_NOT_FOUND",
            Self::QueueFailed => "QUEUE_FAILED",
            Self::IngestionSuccess => "INGESTION_SUCCESS",
            Self::IngestionFailed => "INGESTION_FAILED",
        }
    }
}

impl std::fmt::Display for IngestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IngestionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AWAITING_UPLOAD" => Ok(Self::AwaitingUpload),
            "METADATA_VALIDATED" => Ok(Self::MetadataValidated),
            "INVALID_METADATA" => Ok(Self::InvalidMetadata),
            "BLOB_NOT_FOUND" => Ok(Self::BlobNotFound),
            "QUEUE_FAILED" => Ok(Self::QueueFailed),
            "INGESTION_SUCCESS" => Ok(Self::IngestionSuccess),
            "INGESTION_FAILED" => Ok(Self::IngestionFailed),
            other => Err(format!("Unknown ingestion status: {}", other)),
        }
    }
}

/// Status of an answer-generation pipeline instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnswerStatus {
    /// Accepted and queued, not yet processed
    AnswerGenerationPending,
    /// Retrieval and generation completed
    AnswerGenerated,
    /// Embedding, search, or generation failed
    AnswerGenerationFailed,
}

impl AnswerStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::AnswerGenerationPending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnswerGenerationPending => "ANSWER_GENERATION_PENDING",
            Self::AnswerGenerated => "ANSWER_GENERATED",
            Self::AnswerGenerationFailed => "ANSWER_GENERATION_FAILED",
        }
    }
}

impl std::fmt::Display for AnswerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnswerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ANSWER_GENERATION_PENDING" => Ok(Self::AnswerGenerationPending),
            "ANSWER_GENERATED" => Ok(Self::AnswerGenerated),
            "ANSWER_GENERATION_FAILED" => Ok(Self::AnswerGenerationFailed),
            other => Err(format!("Unknown answer status: {}", other)),
        }
    }
}
