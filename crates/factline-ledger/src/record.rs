use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single source of truth for one pipeline instance.
///
/// Exactly one record exists per identity. Large content (chunk context,
/// raw blobs) lives in object storage; the record carries only references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Stable identity: document id or transaction id
    pub identity: String,
    /// Human-readable name: document filename or originating query
    pub subject_name: String,
    /// Serialized pipeline status; never retroactively moves backward
    pub status: String,
    /// Free-text explanation, present on failure
    pub reason: Option<String>,
    /// Prompt used for answer generation, kept for poll-time re-rendering
    pub query_prompt: Option<String>,
    /// Object-storage reference to the persisted chunk context
    pub artifact_ref: Option<String>,
    /// Formatted model response
    pub response: Option<String>,
    /// Generation duration in milliseconds
    pub duration_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
    /// Advances on every transition
    pub updated_at: DateTime<Utc>,
}

impl LedgerRecord {
    pub fn new(
        identity: impl Into<String>,
        subject_name: impl Into<String>,
        status: impl Into<String>,
        reason: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            identity: identity.into(),
            subject_name: subject_name.into(),
            status: status.into(),
            reason,
            query_prompt: None,
            artifact_ref: None,
            response: None,
            duration_ms: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields written by a status transition.
///
/// An upsert overwrites the record unconditionally (last writer wins);
/// `created_at` and any field left `None` here survive from the existing
/// record so a later transition never erases earlier context.
#[derive(Debug, Clone, Default)]
pub struct LedgerUpsert {
    pub identity: String,
    pub subject_name: Option<String>,
    pub status: String,
    pub reason: Option<String>,
    pub query_prompt: Option<String>,
    pub artifact_ref: Option<String>,
    pub response: Option<String>,
    pub duration_ms: Option<u64>,
}

impl LedgerUpsert {
    pub fn new(identity: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            status: status.into(),
            ..Default::default()
        }
    }

    pub fn with_subject(mut self, subject_name: impl Into<String>) -> Self {
        self.subject_name = Some(subject_name.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_query_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.query_prompt = Some(prompt.into());
        self
    }

    pub fn with_artifact_ref(mut self, artifact_ref: impl Into<String>) -> Self {
        self.artifact_ref = Some(artifact_ref.into());
        self
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Apply this transition over an existing record, or materialize a fresh
    /// one when no record exists for the identity.
    pub fn apply(self, existing: Option<LedgerRecord>) -> LedgerRecord {
        let now = Utc::now();
        match existing {
            Some(record) => LedgerRecord {
                identity: self.identity,
                subject_name: self.subject_name.unwrap_or(record.subject_name),
                status: self.status,
                reason: self.reason.or(record.reason),
                query_prompt: self.query_prompt.or(record.query_prompt),
                artifact_ref: self.artifact_ref.or(record.artifact_ref),
                response: self.response.or(record.response),
                duration_ms: self.duration_ms.or(record.duration_ms),
                created_at: record.created_at,
                updated_at: now,
            },
            None => LedgerRecord {
                identity: self.identity,
                subject_name: self.subject_name.unwrap_or_default(),
                status: self.status,
                reason: self.reason,
                query_prompt: self.query_prompt,
                artifact_ref: self.artifact_ref,
                response: self.response,
                duration_ms: self.duration_ms,
                created_at: now,
                updated_at: now,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_preserves_created_at_and_context() {
        let record = LedgerRecord::new("tx-1", "query", "ANSWER_GENERATION_PENDING", None);
        let created_at = record.created_at;

        let updated = LedgerUpsert::new("tx-1", "ANSWER_GENERATED")
            .with_response("answer text")
            .apply(Some(record));

        assert_eq!(updated.created_at, created_at);
        assert_eq!(updated.subject_name, "query");
        assert_eq!(updated.status, "ANSWER_GENERATED");
        assert_eq!(updated.response.as_deref(), Some("answer text"));
        assert!(updated.updated_at >= created_at);
    }

    #[test]
    fn test_upsert_without_existing_record() {
        let record = LedgerUpsert::new("doc-1", "INGESTION_FAILED")
            .with_subject("a.pdf")
            .with_reason("analysis failed")
            .apply(None);

        assert_eq!(record.identity, "doc-1");
        assert_eq!(record.subject_name, "a.pdf");
        assert_eq!(record.reason.as_deref(), Some("analysis failed"));
    }
}
