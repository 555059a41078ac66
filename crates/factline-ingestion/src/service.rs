//! Ingestion state machine
//!
//! States: AWAITING_UPLOAD → METADATA_VALIDATED → INGESTION_SUCCESS, with
//! terminal failure branches INVALID_METADATA, BLOB_NOT_FOUND, QUEUE_FAILED,
//! and INGESTION_FAILED. No transition retreats to an earlier state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, info, warn};

use factline_adapters::{
    AdapterError, ClientRegistry, DocumentAnalyzer, ObjectStore, QueueClient, VectorIndex,
};
use factline_core::{
    ChunkedEntry, DocumentId, FactlineConfig, IngestionMessage, IngestionStatus, MetadataPair,
    StageError,
};
use factline_ledger::{LedgerUpsert, StatusLedger};

use crate::chunking::PageChunker;
use crate::embedding::EmbeddingEnricher;
use crate::{IngestionError, Result};

/// Upload initiation request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub document_id: String,
    pub document_name: String,
    #[serde(default)]
    pub metadata_filter: Vec<MetadataPair>,
}

/// Write location handed back to the uploading client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub storage_url: String,
    pub document_reference: String,
}

/// Drives documents from upload through indexing.
pub struct IngestionService {
    ledger: StatusLedger,
    clients: ClientRegistry,
    config: FactlineConfig,
    chunker: PageChunker,
    enricher: EmbeddingEnricher,
}

impl IngestionService {
    pub fn new(
        ledger: StatusLedger,
        clients: ClientRegistry,
        config: FactlineConfig,
    ) -> Result<Self> {
        let chunker = PageChunker::new(config.chunking.clone())?;
        let enricher =
            EmbeddingEnricher::new(clients.embeddings.clone(), config.embedding.clone());

        Ok(Self {
            ledger,
            clients,
            config,
            chunker,
            enricher,
        })
    }

    /// Pipeline entry: reserve the identity and hand back a write location.
    ///
    /// Entry is insert-if-absent, so a retried or duplicate client request
    /// observes the existing record instead of double-starting the pipeline.
    pub async fn initiate_upload(&self, request: &UploadRequest) -> Result<UploadReceipt> {
        let document_id = DocumentId::parse(&request.document_id)
            .map_err(|_| IngestionError::Validation(format!(
                "documentId must be a UUID, got: {}",
                request.document_id
            )))?;

        if request.document_name.trim().is_empty() {
            return Err(IngestionError::Validation(
                "documentName must not be blank".to_string(),
            ));
        }
        if request.metadata_filter.is_empty() {
            return Err(IngestionError::Validation(
                "at least one metadataFilter entry is required".to_string(),
            ));
        }
        if request.metadata_filter.iter().any(MetadataPair::is_blank) {
            return Err(IngestionError::Validation(
                "metadataFilter entries must have non-blank keys and values".to_string(),
            ));
        }

        self.ledger
            .insert_if_absent(
                document_id.to_string(),
                request.document_name.clone(),
                IngestionStatus::AwaitingUpload.as_str(),
                None,
            )
            .await?;

        Ok(UploadReceipt {
            storage_url: self.config.storage.blob_url(&request.document_name),
            document_reference: document_id.to_string(),
        })
    }

    /// Blob-landed trigger: validate metadata and hand the document to the
    /// processing queue. Returns the status the document ended up in.
    pub async fn validate_uploaded(&self, document_name: &str) -> Result<IngestionStatus> {
        let record = self.ledger.find_by_subject(document_name).await?;
        let identity = record.identity.clone();

        let properties = match self.clients.object_store.head(document_name).await {
            Ok(properties) => properties,
            Err(AdapterError::BlobNotFound(_)) => {
                warn!(document_name = %document_name, "Uploaded blob not found");
                self.finalize(
                    &identity,
                    IngestionStatus::BlobNotFound,
                    format!("No blob found at {}", document_name),
                )
                .await?;
                return Ok(IngestionStatus::BlobNotFound);
            }
            Err(e) => return Err(StageError::infrastructure(e.to_string()).into()),
        };

        let metadata = match self.validated_metadata(&properties.metadata) {
            Ok(metadata) => metadata,
            Err(reason) => {
                warn!(document_name = %document_name, reason = %reason, "Metadata validation failed");
                self.finalize(&identity, IngestionStatus::InvalidMetadata, reason)
                    .await?;
                return Ok(IngestionStatus::InvalidMetadata);
            }
        };

        self.ledger
            .upsert(LedgerUpsert::new(
                &identity,
                IngestionStatus::MetadataValidated.as_str(),
            ))
            .await?;

        let message = IngestionMessage::new(
            &identity,
            document_name,
            metadata,
            self.config.storage.blob_url(document_name),
        );
        let payload = serde_json::to_vec(&message)?;

        if let Err(e) = self
            .clients
            .queue
            .send(&self.config.queues.ingestion_queue, payload)
            .await
        {
            // Validation succeeded, delivery did not: operators can tell
            // data-quality failures from infrastructure failures.
            error!(document_name = %document_name, error = %e, "Ingestion enqueue failed");
            self.finalize(&identity, IngestionStatus::QueueFailed, e.to_string())
                .await?;
            return Ok(IngestionStatus::QueueFailed);
        }

        info!(document_id = %identity, document_name = %document_name, "Document queued for ingestion");
        Ok(IngestionStatus::MetadataValidated)
    }

    /// Queue-triggered processing: analysis → chunking → embedding →
    /// index upload, finalized with exactly one terminal write.
    ///
    /// Business failures are swallowed after being recorded (redelivery
    /// cannot fix a malformed document); infrastructure failures are also
    /// recorded but returned, so the queue runtime's redelivery applies.
    pub async fn process(&self, message: &IngestionMessage) -> Result<()> {
        match self.run_stages(message).await {
            Ok(indexed) => {
                self.ledger
                    .upsert(
                        LedgerUpsert::new(
                            &message.document_id,
                            IngestionStatus::IngestionSuccess.as_str(),
                        )
                        .with_artifact_ref(chunk_file_name(&message.document_id))
                        .with_reason(format!("{} chunks indexed", indexed)),
                    )
                    .await?;
                Ok(())
            }
            Err(stage_error) => {
                error!(
                    document_id = %message.document_id,
                    kind = ?stage_error.kind,
                    error = %stage_error,
                    "Ingestion processing failed"
                );
                self.finalize(
                    &message.document_id,
                    IngestionStatus::IngestionFailed,
                    stage_error.to_string(),
                )
                .await?;

                if stage_error.is_retryable() {
                    Err(stage_error.into())
                } else {
                    Ok(())
                }
            }
        }
    }

    async fn run_stages(
        &self,
        message: &IngestionMessage,
    ) -> std::result::Result<usize, StageError> {
        let content = self
            .clients
            .object_store
            .get(&message.document_name)
            .await
            .map_err(|e| StageError::infrastructure(e.to_string()))?;

        // Malformed content cannot be fixed by redelivery
        let pages = self
            .clients
            .analyzer
            .analyze(&content)
            .await
            .map_err(|e| StageError::business(e.to_string()))?;

        let metadata: Vec<MetadataPair> = message
            .metadata
            .iter()
            .map(|(k, v)| MetadataPair::new(k, v))
            .collect();

        let mut chunks = self.chunker.chunk_pages(
            &message.document_id,
            &message.document_name,
            &metadata,
            &pages,
        );

        if chunks.is_empty() {
            return Err(StageError::business("Document produced no chunks"));
        }

        self.enricher.enrich(&mut chunks).await;

        let (ready, rejected) = self.enricher.vector_complete(chunks);
        if ready.is_empty() {
            return Err(StageError::business(format!(
                "Embedding produced no vector-complete chunks ({} rejected)",
                rejected
            )));
        }

        // First upload failure aborts the remaining uploads: all or nothing
        for entry in &ready {
            self.clients
                .index
                .upload(entry)
                .await
                .map_err(|e| StageError::infrastructure(e.to_string()))?;
        }

        self.persist_chunk_file(&message.document_id, &ready)
            .await?;

        info!(
            document_id = %message.document_id,
            indexed = ready.len(),
            rejected,
            "Document ingested"
        );

        Ok(ready.len())
    }

    /// Persist the indexed chunk set out-of-band; the ledger keeps only the
    /// file reference.
    async fn persist_chunk_file(
        &self,
        document_id: &str,
        chunks: &[ChunkedEntry],
    ) -> std::result::Result<(), StageError> {
        let payload = serde_json::to_vec(chunks)
            .map_err(|e| StageError::business(e.to_string()))?;

        self.clients
            .object_store
            .put(&chunk_file_name(document_id), payload, HashMap::new())
            .await
            .map_err(|e| StageError::infrastructure(e.to_string()))
    }

    /// Flatten and validate the blob metadata map: the document id key is
    /// required and UUID-formatted; a nested JSON-encoded map is expanded
    /// into the flat map, with any blank key or value rejected.
    fn validated_metadata(
        &self,
        raw: &HashMap<String, String>,
    ) -> std::result::Result<HashMap<String, String>, String> {
        let id_key = &self.config.storage.document_id_key;
        let document_id = raw
            .get(id_key)
            .ok_or_else(|| format!("Required metadata key '{}' is missing", id_key))?;
        DocumentId::parse(document_id)
            .map_err(|_| format!("Metadata key '{}' is not a UUID: {}", id_key, document_id))?;

        let mut flat: HashMap<String, String> = raw.clone();

        if let Some(nested_json) = flat.remove(&self.config.storage.nested_metadata_key) {
            let nested: HashMap<String, String> = serde_json::from_str(&nested_json)
                .map_err(|e| format!("Nested metadata is not a JSON object: {}", e))?;

            for (key, value) in nested {
                if key.trim().is_empty() || value.trim().is_empty() {
                    return Err("Nested metadata contains a blank key or value".to_string());
                }
                flat.insert(key, value);
            }
        }

        Ok(flat)
    }

    async fn finalize(
        &self,
        identity: &str,
        status: IngestionStatus,
        reason: String,
    ) -> Result<()> {
        self.ledger
            .upsert(LedgerUpsert::new(identity, status.as_str()).with_reason(reason))
            .await?;
        Ok(())
    }
}

fn chunk_file_name(document_id: &str) -> String {
    format!("{}.chunks.json", document_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use factline_adapters::{MemoryObjectStore, MemoryQueue};
    use factline_ledger::{LedgerError, MemoryLedger};
    use std::str::FromStr;
    use std::sync::Arc;

    const DOC_ID: &str = "6f9619ff-8b86-d011-b42d-00c04fc964ff";

    fn test_config() -> FactlineConfig {
        let mut config = FactlineConfig::default();
        config.chunking.chunk_size_chars = 120;
        config.chunking.chunk_overlap_chars = 20;
        config.chunking.min_chunk_chars = 10;
        config.embedding.dimension = 8;
        config.embedding.batch_size = 4;
        config
    }

    struct Harness {
        service: IngestionService,
        ledger: StatusLedger,
        store: Arc<MemoryObjectStore>,
        queue: Arc<MemoryQueue>,
        index: Arc<factline_adapters::MemoryVectorIndex>,
    }

    fn harness() -> Harness {
        harness_with(|registry| registry)
    }

    fn harness_with(customize: impl FnOnce(ClientRegistry) -> ClientRegistry) -> Harness {
        let config = test_config();
        let queue = Arc::new(MemoryQueue::new());
        let store = Arc::new(MemoryObjectStore::new());
        let index = Arc::new(factline_adapters::MemoryVectorIndex::new(
            config.embedding.dimension,
        ));

        let mut registry = ClientRegistry::in_memory(queue.clone(), config.embedding.dimension);
        registry.object_store = store.clone();
        registry.index = index.clone();
        let registry = customize(registry);

        let ledger = StatusLedger::new(Arc::new(MemoryLedger::new()));
        let service = IngestionService::new(ledger.clone(), registry, config).unwrap();

        Harness {
            service,
            ledger,
            store,
            queue,
            index,
        }
    }

    fn upload_request() -> UploadRequest {
        UploadRequest {
            document_id: DOC_ID.to_string(),
            document_name: "contract.pdf".to_string(),
            metadata_filter: vec![MetadataPair::new("department", "legal")],
        }
    }

    async fn seed_blob(store: &MemoryObjectStore, with_doc_id: bool) {
        let mut metadata = HashMap::new();
        if with_doc_id {
            metadata.insert("documentId".to_string(), DOC_ID.to_string());
        }
        metadata.insert(
            "customMetadata".to_string(),
            r#"{"department":"legal"}"#.to_string(),
        );
        store
            .put(
                "contract.pdf",
                b"The contract terminates after thirty days written notice. \
                  Either party may renew under the same commercial terms."
                    .to_vec(),
                metadata,
            )
            .await
            .unwrap();
    }

    fn ingestion_message() -> IngestionMessage {
        let mut metadata = HashMap::new();
        metadata.insert("department".to_string(), "legal".to_string());
        IngestionMessage::new(DOC_ID, "contract.pdf", metadata, "mem://documents/contract.pdf")
    }

    #[tokio::test]
    async fn test_duplicate_upload_rejected() {
        let h = harness();

        let receipt = h.service.initiate_upload(&upload_request()).await.unwrap();
        assert_eq!(receipt.document_reference, DOC_ID);
        assert!(receipt.storage_url.ends_with("contract.pdf"));

        let second = h.service.initiate_upload(&upload_request()).await;
        assert!(matches!(second, Err(IngestionError::Duplicate(_))));

        let record = h.ledger.get(DOC_ID).await.unwrap();
        assert_eq!(record.status, IngestionStatus::AwaitingUpload.as_str());
    }

    #[tokio::test]
    async fn test_upload_validation() {
        let h = harness();

        let mut bad_id = upload_request();
        bad_id.document_id = "not-a-uuid".to_string();
        assert!(matches!(
            h.service.initiate_upload(&bad_id).await,
            Err(IngestionError::Validation(_))
        ));

        let mut blank_name = upload_request();
        blank_name.document_name = "  ".to_string();
        assert!(h.service.initiate_upload(&blank_name).await.is_err());

        let mut no_filters = upload_request();
        no_filters.metadata_filter.clear();
        assert!(h.service.initiate_upload(&no_filters).await.is_err());

        let mut blank_filter = upload_request();
        blank_filter.metadata_filter = vec![MetadataPair::new("", "legal")];
        assert!(h.service.initiate_upload(&blank_filter).await.is_err());

        // Rejected requests never create ledger records
        assert!(matches!(
            h.ledger.get("not-a-uuid").await,
            Err(LedgerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_validate_uploaded_happy_path() {
        let h = harness();
        h.service.initiate_upload(&upload_request()).await.unwrap();
        seed_blob(&h.store, true).await;

        let status = h.service.validate_uploaded("contract.pdf").await.unwrap();
        assert_eq!(status, IngestionStatus::MetadataValidated);

        let payload = h.queue.pop("document-ingestion").await.unwrap();
        let message: IngestionMessage = serde_json::from_slice(&payload).unwrap();
        assert_eq!(message.document_id, DOC_ID);
        // Nested metadata was flattened
        assert_eq!(message.metadata.get("department").unwrap(), "legal");
        assert!(!message.metadata.contains_key("customMetadata"));
    }

    #[tokio::test]
    async fn test_blob_not_found_is_terminal() {
        let h = harness();
        h.service.initiate_upload(&upload_request()).await.unwrap();

        let status = h.service.validate_uploaded("contract.pdf").await.unwrap();
        assert_eq!(status, IngestionStatus::BlobNotFound);

        let record = h.ledger.get(DOC_ID).await.unwrap();
        assert_eq!(record.status, IngestionStatus::BlobNotFound.as_str());
        assert!(record.reason.is_some());
        assert_eq!(h.queue.len("document-ingestion").await, 0);
    }

    #[tokio::test]
    async fn test_missing_document_id_metadata() {
        let h = harness();
        h.service.initiate_upload(&upload_request()).await.unwrap();
        seed_blob(&h.store, false).await;

        let status = h.service.validate_uploaded("contract.pdf").await.unwrap();
        assert_eq!(status, IngestionStatus::InvalidMetadata);

        let record = h.ledger.get(DOC_ID).await.unwrap();
        assert!(record.reason.unwrap().contains("documentId"));
    }

    #[tokio::test]
    async fn test_blank_nested_metadata_rejected() {
        let h = harness();
        h.service.initiate_upload(&upload_request()).await.unwrap();

        let mut metadata = HashMap::new();
        metadata.insert("documentId".to_string(), DOC_ID.to_string());
        metadata.insert(
            "customMetadata".to_string(),
            r#"{"department":"  "}"#.to_string(),
        );
        h.store
            .put("contract.pdf", b"content".to_vec(), metadata)
            .await
            .unwrap();

        let status = h.service.validate_uploaded("contract.pdf").await.unwrap();
        assert_eq!(status, IngestionStatus::InvalidMetadata);
    }

    struct FailingQueue;

    #[async_trait]
    impl QueueClient for FailingQueue {
        async fn send(&self, _queue: &str, _payload: Vec<u8>) -> factline_adapters::Result<()> {
            Err(AdapterError::Queue("broker unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_enqueue_failure_distinct_from_bad_data() {
        let h = harness_with(|mut registry| {
            registry.queue = Arc::new(FailingQueue);
            registry
        });
        h.service.initiate_upload(&upload_request()).await.unwrap();
        seed_blob(&h.store, true).await;

        let status = h.service.validate_uploaded("contract.pdf").await.unwrap();
        assert_eq!(status, IngestionStatus::QueueFailed);

        let record = h.ledger.get(DOC_ID).await.unwrap();
        assert!(record.reason.unwrap().contains("broker unavailable"));
    }

    #[tokio::test]
    async fn test_process_happy_path() {
        let h = harness();
        h.service.initiate_upload(&upload_request()).await.unwrap();
        seed_blob(&h.store, true).await;
        h.service.validate_uploaded("contract.pdf").await.unwrap();

        h.service.process(&ingestion_message()).await.unwrap();

        let record = h.ledger.get(DOC_ID).await.unwrap();
        assert_eq!(record.status, IngestionStatus::IngestionSuccess.as_str());
        assert_eq!(
            record.artifact_ref.as_deref(),
            Some(format!("{}.chunks.json", DOC_ID).as_str())
        );
        assert!(h.index.len().await > 0);

        // The chunk file round-trips
        let chunk_file = h
            .store
            .get(&format!("{}.chunks.json", DOC_ID))
            .await
            .unwrap();
        let chunks: Vec<ChunkedEntry> = serde_json::from_slice(&chunk_file).unwrap();
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.embedding_vector.is_some()));
    }

    #[tokio::test]
    async fn test_process_replay_is_idempotent_in_effect() {
        let h = harness();
        h.service.initiate_upload(&upload_request()).await.unwrap();
        seed_blob(&h.store, true).await;

        h.service.process(&ingestion_message()).await.unwrap();
        let first = h.ledger.get(DOC_ID).await.unwrap();

        // Redelivery re-runs the stages; wasteful but not incorrect
        h.service.process(&ingestion_message()).await.unwrap();
        let second = h.ledger.get(DOC_ID).await.unwrap();

        assert_eq!(first.status, second.status);
        assert_eq!(first.created_at, second.created_at);
    }

    struct FailingIndex;

    #[async_trait]
    impl VectorIndex for FailingIndex {
        async fn upload(&self, _entry: &ChunkedEntry) -> factline_adapters::Result<()> {
            Err(AdapterError::Index("index unavailable".to_string()))
        }

        async fn search(
            &self,
            _vector: &[f32],
            _filters: &[MetadataPair],
            _top_k: usize,
        ) -> factline_adapters::Result<Vec<ChunkedEntry>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_index_failure_is_terminal_and_retryable() {
        let h = harness_with(|mut registry| {
            registry.index = Arc::new(FailingIndex);
            registry
        });
        h.service.initiate_upload(&upload_request()).await.unwrap();
        seed_blob(&h.store, true).await;

        // Infrastructure failure: recorded AND surfaced for redelivery
        let result = h.service.process(&ingestion_message()).await;
        assert!(result.is_err());

        let record = h.ledger.get(DOC_ID).await.unwrap();
        assert_eq!(record.status, IngestionStatus::IngestionFailed.as_str());
        assert!(record.reason.unwrap().contains("index unavailable"));
    }

    struct FailingAnalyzer;

    #[async_trait]
    impl factline_adapters::DocumentAnalyzer for FailingAnalyzer {
        async fn analyze(
            &self,
            _content: &[u8],
        ) -> factline_adapters::Result<Vec<factline_adapters::AnalyzedPage>> {
            Err(AdapterError::Analysis("unreadable layout".to_string()))
        }
    }

    #[tokio::test]
    async fn test_malformed_document_swallowed_after_terminal_write() {
        let h = harness_with(|mut registry| {
            registry.analyzer = Arc::new(FailingAnalyzer);
            registry
        });
        h.service.initiate_upload(&upload_request()).await.unwrap();
        seed_blob(&h.store, true).await;

        // Business failure: recorded, then swallowed so redelivery stops
        h.service.process(&ingestion_message()).await.unwrap();

        let record = h.ledger.get(DOC_ID).await.unwrap();
        assert_eq!(record.status, IngestionStatus::IngestionFailed.as_str());
        assert!(record.reason.unwrap().contains("unreadable layout"));
    }

    #[tokio::test]
    async fn test_status_never_revisits_earlier_state() {
        let h = harness();
        let mut observed = Vec::new();

        h.service.initiate_upload(&upload_request()).await.unwrap();
        observed.push(h.ledger.get(DOC_ID).await.unwrap().status);

        seed_blob(&h.store, true).await;
        h.service.validate_uploaded("contract.pdf").await.unwrap();
        observed.push(h.ledger.get(DOC_ID).await.unwrap().status);

        h.service.process(&ingestion_message()).await.unwrap();
        observed.push(h.ledger.get(DOC_ID).await.unwrap().status);

        assert_eq!(
            observed,
            vec![
                IngestionStatus::AwaitingUpload.as_str().to_string(),
                IngestionStatus::MetadataValidated.as_str().to_string(),
                IngestionStatus::IngestionSuccess.as_str().to_string(),
            ]
        );
        assert!(IngestionStatus::from_str(&observed[2]).unwrap().is_terminal());
    }
}
