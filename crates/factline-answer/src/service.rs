//! Answer state machine
//!
//! States: ANSWER_GENERATION_PENDING → ANSWER_GENERATED or
//! ANSWER_GENERATION_FAILED, both terminal. The synchronous path runs the
//! same retrieval and generation inline without touching the ledger.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{error, info, warn};

use factline_adapters::{
    ChatClient, ClientRegistry, EmbeddingClient, ObjectStore, QueueClient, VectorIndex,
};
use factline_citations::format_citations;
use factline_core::{
    AnswerMessage, AnswerStatus, ChunkedEntry, FactlineConfig, MetadataPair, PollRenderMode,
    StageError, TransactionId,
};
use factline_ledger::{LedgerRecord, LedgerUpsert, StatusLedger};

use crate::{AnswerError, Result};

/// Answer request body, shared by the sync and async paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub user_query: String,
    pub query_prompt: String,
    #[serde(default)]
    pub metadata_filter: Vec<MetadataPair>,
}

/// Accepted async submission: the identity to poll with.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub transaction_id: String,
    pub status: String,
}

/// Synchronous answer, returned inline with the retrieved context.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAnswer {
    pub user_query: String,
    pub llm_response: String,
    pub query_prompt: String,
    pub chunked_entries: Vec<ChunkedEntry>,
}

/// Poll response; fields beyond identity and status appear only once the
/// ledger record carries them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub transaction_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

struct Generated {
    formatted: String,
    chunks: Vec<ChunkedEntry>,
}

/// Drives queries from submission through retrieval and generation.
pub struct AnswerService {
    ledger: StatusLedger,
    clients: ClientRegistry,
    config: FactlineConfig,
}

impl AnswerService {
    pub fn new(ledger: StatusLedger, clients: ClientRegistry, config: FactlineConfig) -> Self {
        Self {
            ledger,
            clients,
            config,
        }
    }

    /// Async entry: mint a transaction, record PENDING, then enqueue.
    ///
    /// The ledger write comes first so a ledger failure surfaces to the
    /// caller instead of leaving an untracked message in flight. An enqueue
    /// failure after the write is recorded as a terminal failure, so the
    /// returned id still resolves on poll.
    pub async fn submit(&self, request: &AnswerRequest) -> Result<SubmitReceipt> {
        validate(request)?;

        let transaction_id = TransactionId::new().to_string();
        let message = AnswerMessage {
            transaction_id: transaction_id.clone(),
            user_query: request.user_query.clone(),
            user_query_prompt: request.query_prompt.clone(),
            metadata_filters: request.metadata_filter.clone(),
        };
        let payload = serde_json::to_vec(&message)?;

        self.ledger
            .insert_if_absent(
                transaction_id.clone(),
                request.user_query.clone(),
                AnswerStatus::AnswerGenerationPending.as_str(),
                None,
            )
            .await?;

        if let Err(e) = self
            .clients
            .queue
            .send(&self.config.queues.answer_queue, payload)
            .await
        {
            error!(transaction_id = %transaction_id, error = %e, "Answer enqueue failed");
            self.ledger
                .upsert(
                    LedgerUpsert::new(
                        &transaction_id,
                        AnswerStatus::AnswerGenerationFailed.as_str(),
                    )
                    .with_reason(e.to_string()),
                )
                .await?;
            return Err(StageError::infrastructure(e.to_string()).into());
        }

        info!(transaction_id = %transaction_id, "Answer request queued");
        Ok(SubmitReceipt {
            transaction_id,
            status: AnswerStatus::AnswerGenerationPending.as_str().to_string(),
        })
    }

    /// Queue-triggered generation, finalized with exactly one terminal
    /// write per run. Failures at embedding, search, generation, or
    /// context persistence are recorded with the elapsed duration and
    /// returned so the queue runtime's redelivery applies; no path leaves
    /// the record pending.
    pub async fn process(&self, message: &AnswerMessage) -> Result<()> {
        let started = Instant::now();
        let outcome = self.run_stages(message).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok((formatted, context_ref, chunk_count)) => {
                self.ledger
                    .upsert(
                        LedgerUpsert::new(
                            &message.transaction_id,
                            AnswerStatus::AnswerGenerated.as_str(),
                        )
                        .with_query_prompt(&message.user_query_prompt)
                        .with_response(formatted)
                        .with_artifact_ref(context_ref)
                        .with_duration_ms(duration_ms),
                    )
                    .await?;

                info!(
                    transaction_id = %message.transaction_id,
                    duration_ms,
                    chunks = chunk_count,
                    "Answer generated"
                );
                Ok(())
            }
            Err(stage_error) => {
                error!(
                    transaction_id = %message.transaction_id,
                    kind = ?stage_error.kind,
                    error = %stage_error,
                    "Answer generation failed"
                );
                self.ledger
                    .upsert(
                        LedgerUpsert::new(
                            &message.transaction_id,
                            AnswerStatus::AnswerGenerationFailed.as_str(),
                        )
                        .with_reason(stage_error.to_string())
                        .with_duration_ms(duration_ms),
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
        message: &AnswerMessage,
    ) -> std::result::Result<(String, String, usize), StageError> {
        let generated = self
            .generate(
                &message.user_query,
                &message.user_query_prompt,
                &message.metadata_filters,
            )
            .await?;

        let context_ref = self
            .persist_context(&message.transaction_id, &generated.chunks)
            .await?;

        Ok((generated.formatted, context_ref, generated.chunks.len()))
    }

    /// Inline path: same retrieval and generation, no ledger involvement.
    pub async fn answer_sync(&self, request: &AnswerRequest) -> Result<SyncAnswer> {
        validate(request)?;

        let generated = self
            .generate(
                &request.user_query,
                &request.query_prompt,
                &request.metadata_filter,
            )
            .await?;

        Ok(SyncAnswer {
            user_query: request.user_query.clone(),
            llm_response: generated.formatted,
            query_prompt: request.query_prompt.clone(),
            chunked_entries: generated.chunks,
        })
    }

    /// Status poll; unknown identity is NotFound, distinct from a known
    /// identity that is still pending.
    pub async fn poll(&self, transaction_id: &str) -> Result<PollResponse> {
        let record = self.ledger.get(transaction_id).await?;

        let mut response = PollResponse {
            transaction_id: record.identity.clone(),
            status: record.status.clone(),
            user_query: None,
            llm_response: None,
            reason: None,
            duration_ms: None,
        };

        match record.status.as_str() {
            s if s == AnswerStatus::AnswerGenerated.as_str() => {
                response.user_query = Some(record.subject_name.clone());
                response.duration_ms = record.duration_ms;
                response.llm_response = Some(match self.config.answer.poll_render {
                    PollRenderMode::Cached => record.response.clone().unwrap_or_default(),
                    PollRenderMode::Regenerate => self.rerender(&record).await,
                });
            }
            s if s == AnswerStatus::AnswerGenerationFailed.as_str() => {
                response.reason = record.reason.clone();
                response.duration_ms = record.duration_ms;
            }
            _ => {}
        }

        Ok(response)
    }

    /// Reload the persisted chunk context and re-invoke generation. Falls
    /// back to the persisted answer when re-rendering fails; poll must not
    /// error on a record that already holds a good answer.
    async fn rerender(&self, record: &LedgerRecord) -> String {
        let cached = record.response.clone().unwrap_or_default();

        let Some(context_ref) = record.artifact_ref.as_deref() else {
            return cached;
        };

        let chunks: Vec<ChunkedEntry> = match self.clients.object_store.get(context_ref).await {
            Ok(content) => match serde_json::from_slice(&content) {
                Ok(chunks) => chunks,
                Err(e) => {
                    warn!(identity = %record.identity, error = %e, "Persisted context unreadable");
                    return cached;
                }
            },
            Err(e) => {
                warn!(identity = %record.identity, error = %e, "Persisted context fetch failed");
                return cached;
            }
        };

        let prompt = record.query_prompt.clone().unwrap_or_default();
        match self
            .clients
            .chat
            .complete(&prompt, &compose_user_prompt(&record.subject_name, &chunks))
            .await
        {
            Ok(raw) => format_citations(&raw),
            Err(e) => {
                warn!(identity = %record.identity, error = %e, "Re-render failed");
                cached
            }
        }
    }

    async fn generate(
        &self,
        user_query: &str,
        query_prompt: &str,
        filters: &[MetadataPair],
    ) -> std::result::Result<Generated, StageError> {
        let vectors = self
            .clients
            .embeddings
            .embed_batch(&[user_query.to_string()])
            .await
            .map_err(|e| StageError::infrastructure(e.to_string()))?;
        let query_vector = vectors
            .into_iter()
            .next()
            .ok_or_else(|| StageError::infrastructure("Embedding backend returned no vector"))?;

        let chunks = self
            .clients
            .index
            .search(&query_vector, filters, self.config.retrieval.top_k)
            .await
            .map_err(|e| StageError::infrastructure(e.to_string()))?;

        let raw = self
            .clients
            .chat
            .complete(query_prompt, &compose_user_prompt(user_query, &chunks))
            .await
            .map_err(|e| StageError::infrastructure(e.to_string()))?;

        Ok(Generated {
            formatted: format_citations(&raw),
            chunks,
        })
    }

    async fn persist_context(
        &self,
        transaction_id: &str,
        chunks: &[ChunkedEntry],
    ) -> std::result::Result<String, StageError> {
        let name = format!("{}.context.json", transaction_id);
        let payload =
            serde_json::to_vec(chunks).map_err(|e| StageError::business(e.to_string()))?;

        self.clients
            .object_store
            .put(&name, payload, HashMap::new())
            .await
            .map_err(|e| StageError::infrastructure(e.to_string()))?;

        Ok(name)
    }
}

fn validate(request: &AnswerRequest) -> Result<()> {
    if request.user_query.trim().is_empty() {
        return Err(AnswerError::Validation(
            "userQuery must not be blank".to_string(),
        ));
    }
    if request.query_prompt.trim().is_empty() {
        return Err(AnswerError::Validation(
            "queryPrompt must not be blank".to_string(),
        ));
    }
    if request.metadata_filter.is_empty() {
        return Err(AnswerError::Validation(
            "at least one metadataFilter entry is required".to_string(),
        ));
    }
    if request.metadata_filter.iter().any(MetadataPair::is_blank) {
        return Err(AnswerError::Validation(
            "metadataFilter entries must have non-blank keys and values".to_string(),
        ));
    }
    Ok(())
}

fn compose_user_prompt(user_query: &str, chunks: &[ChunkedEntry]) -> String {
    let context = chunks
        .iter()
        .map(|c| c.chunk.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("Context:\n{}\n\nQuestion:\n{}", context, user_query)
}
