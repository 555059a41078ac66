use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::record::{LedgerRecord, LedgerUpsert};
use crate::Result;

/// Narrow contract over the durable record store.
///
/// A production deployment backs this with a table service; tests and dev
/// mode use [`crate::MemoryLedger`]. Per identity, single-writer-at-a-time
/// is assumed; concurrent upserts for the same identity are last write wins.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Create the record for an identity; first writer wins.
    async fn insert_if_absent(&self, record: LedgerRecord) -> Result<()>;

    /// Unconditionally write the record for a status transition.
    async fn upsert(&self, upsert: LedgerUpsert) -> Result<LedgerRecord>;

    /// Point lookup by identity.
    async fn get(&self, identity: &str) -> Result<LedgerRecord>;

    /// Lookup by subject name (document filename); a table backend would
    /// serve this from a secondary index.
    async fn find_by_subject(&self, subject_name: &str) -> Result<LedgerRecord>;
}

/// Status ledger facade used by the pipeline state machines.
///
/// Adds the audit trail: every write is logged with identity and status so
/// the full transition history can be reconstructed from logs.
#[derive(Clone)]
pub struct StatusLedger {
    store: Arc<dyn LedgerStore>,
}

impl StatusLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Pipeline-entry write; fails with `Duplicate` if the identity already
    /// has a record, so retried client requests never restart work.
    pub async fn insert_if_absent(
        &self,
        identity: impl Into<String>,
        subject_name: impl Into<String>,
        status: impl Into<String>,
        reason: Option<String>,
    ) -> Result<()> {
        let record = LedgerRecord::new(identity, subject_name, status, reason);
        let identity = record.identity.clone();
        let status = record.status.clone();

        self.store.insert_if_absent(record).await?;

        info!(identity = %identity, status = %status, "Ledger record created");
        Ok(())
    }

    /// Status-transition write; unconditional, so replaying the same
    /// transition is a no-op in effect.
    pub async fn upsert(&self, upsert: LedgerUpsert) -> Result<LedgerRecord> {
        let record = self.store.upsert(upsert).await?;

        info!(
            identity = %record.identity,
            status = %record.status,
            "Ledger record updated"
        );
        Ok(record)
    }

    pub async fn get(&self, identity: &str) -> Result<LedgerRecord> {
        self.store.get(identity).await
    }

    pub async fn find_by_subject(&self, subject_name: &str) -> Result<LedgerRecord> {
        self.store.find_by_subject(subject_name).await
    }
}
