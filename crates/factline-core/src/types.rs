use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

// Newtype wrappers for type safety

/// Identity of one document ingestion pipeline instance.
///
/// Document ids arrive from clients as strings and must conform to the
/// UUID format; anything else is a validation failure, never a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| CoreError::InvalidIdentifier(value.to_string()))
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one answer-generation pipeline instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| CoreError::InvalidIdentifier(value.to_string()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single key/value metadata pair, carried from upload time through
/// chunking and later used as a retrieval filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataPair {
    pub key: String,
    pub value: String,
}

impl MetadataPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// A pair with a blank key or value carries no filter semantics and is
    /// treated as a metadata validation failure upstream.
    pub fn is_blank(&self) -> bool {
        self.key.trim().is_empty() || self.value.trim().is_empty()
    }
}

/// A single retrievable unit of document text.
///
/// Created by the chunking stage without a vector; the embedding stage
/// attaches the vector in place; immutable once uploaded to the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkedEntry {
    /// Unique chunk identifier
    pub id: String,
    /// Owning document identifier
    pub document_id: String,
    /// Chunk text
    pub chunk: String,
    /// Embedding vector, populated only after the embedding stage
    #[serde(default)]
    pub embedding_vector: Option<Vec<f32>>,
    /// Page the chunk was extracted from
    pub page_number: u32,
    /// Position of the chunk within its page
    pub chunk_index: usize,
    /// Original filename of the source document
    pub source_file_name: String,
    /// Ordered upload-time metadata pairs, used as retrieval filters
    pub custom_metadata: Vec<MetadataPair>,
}

impl ChunkedEntry {
    pub fn new(
        document_id: impl Into<String>,
        chunk: impl Into<String>,
        page_number: u32,
        chunk_index: usize,
        source_file_name: impl Into<String>,
        custom_metadata: Vec<MetadataPair>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.into(),
            chunk: chunk.into(),
            embedding_vector: None,
            page_number,
            chunk_index,
            source_file_name: source_file_name.into(),
            custom_metadata,
        }
    }

    /// Whether the chunk carries any embeddable text.
    pub fn has_text(&self) -> bool {
        !self.chunk.trim().is_empty()
    }

    /// Whether the attached vector matches the expected dimension.
    ///
    /// An absent or wrong-dimension vector is a hard index upload failure,
    /// so callers filter on this before upload.
    pub fn has_vector_of(&self, dimension: usize) -> bool {
        self.embedding_vector
            .as_ref()
            .map(|v| v.len() == dimension)
            .unwrap_or(false)
    }

    /// Whether the entry matches every given metadata filter exactly.
    pub fn matches_filters(&self, filters: &[MetadataPair]) -> bool {
        filters.iter().all(|f| {
            self.custom_metadata
                .iter()
                .any(|m| m.key == f.key && m.value == f.value)
        })
    }
}
