use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::MetadataPair;

/// Queue message dispatched after upload metadata validation succeeds,
/// consumed by the ingestion processing stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionMessage {
    pub document_id: String,
    pub document_name: String,
    /// Flattened upload-time metadata, nested maps already expanded
    pub metadata: HashMap<String, String>,
    pub blob_url: String,
    pub current_timestamp: DateTime<Utc>,
}

impl IngestionMessage {
    pub fn new(
        document_id: impl Into<String>,
        document_name: impl Into<String>,
        metadata: HashMap<String, String>,
        blob_url: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            document_name: document_name.into(),
            metadata,
            blob_url: blob_url.into(),
            current_timestamp: Utc::now(),
        }
    }
}

/// Queue message dispatched when an async answer request is accepted,
/// consumed by the answer-generation stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerMessage {
    pub transaction_id: String,
    pub user_query: String,
    pub user_query_prompt: String,
    pub metadata_filters: Vec<MetadataPair>,
}
