//! In-memory ledger backend
//!
//! Backs tests and dev mode; the production deployment substitutes a table
//! service behind the same [`LedgerStore`] contract.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::record::{LedgerRecord, LedgerUpsert};
use crate::store::LedgerStore;
use crate::{LedgerError, Result};

/// In-memory ledger keyed by identity.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    records: Arc<RwLock<HashMap<String, LedgerRecord>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held; used by idempotency tests.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn insert_if_absent(&self, record: LedgerRecord) -> Result<()> {
        let mut records = self.records.write().await;

        if records.contains_key(&record.identity) {
            return Err(LedgerError::Duplicate(record.identity));
        }

        debug!(identity = %record.identity, "Inserting ledger record");
        records.insert(record.identity.clone(), record);
        Ok(())
    }

    async fn upsert(&self, upsert: LedgerUpsert) -> Result<LedgerRecord> {
        let mut records = self.records.write().await;

        let existing = records.get(&upsert.identity).cloned();
        let record = upsert.apply(existing);
        records.insert(record.identity.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, identity: &str) -> Result<LedgerRecord> {
        self.records
            .read()
            .await
            .get(identity)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(identity.to_string()))
    }

    async fn find_by_subject(&self, subject_name: &str) -> Result<LedgerRecord> {
        self.records
            .read()
            .await
            .values()
            .find(|r| r.subject_name == subject_name)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(subject_name.to_string()))
    }
}
