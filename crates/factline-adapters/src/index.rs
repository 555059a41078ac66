//! Vector index contract
//!
//! Upload is per entry so the ingestion stage can abort remaining uploads
//! on the first failure. Search applies exact-match metadata filters before
//! similarity ranking.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use factline_core::{ChunkedEntry, MetadataPair};

use crate::{AdapterError, Result};

/// Narrow upload/search contract over the vector search service.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Upload one entry; an absent or wrong-dimension vector is rejected.
    async fn upload(&self, entry: &ChunkedEntry) -> Result<()>;

    /// Filtered similarity search returning the top-k matching entries.
    async fn search(
        &self,
        vector: &[f32],
        filters: &[MetadataPair],
        top_k: usize,
    ) -> Result<Vec<ChunkedEntry>>;
}

/// In-memory vector index with cosine scoring.
#[derive(Clone)]
pub struct MemoryVectorIndex {
    dimension: usize,
    entries: Arc<RwLock<Vec<ChunkedEntry>>>,
}

impl MemoryVectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upload(&self, entry: &ChunkedEntry) -> Result<()> {
        let vector = entry
            .embedding_vector
            .as_ref()
            .ok_or_else(|| AdapterError::Index(format!("Entry {} has no vector", entry.id)))?;

        if vector.len() != self.dimension {
            return Err(AdapterError::Index(format!(
                "Entry {} vector dimension {} does not match index dimension {}",
                entry.id,
                vector.len(),
                self.dimension
            )));
        }

        debug!(entry_id = %entry.id, document_id = %entry.document_id, "Indexing entry");
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        filters: &[MetadataPair],
        top_k: usize,
    ) -> Result<Vec<ChunkedEntry>> {
        let entries = self.entries.read().await;

        let mut scored: Vec<(f32, &ChunkedEntry)> = entries
            .iter()
            .filter(|e| e.matches_filters(filters))
            .filter_map(|e| {
                e.embedding_vector
                    .as_ref()
                    .map(|v| (Self::cosine(vector, v), e))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, e)| e.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str, vector: Vec<f32>, filters: Vec<MetadataPair>) -> ChunkedEntry {
        let mut entry = ChunkedEntry::new("doc-1", text, 1, 0, "a.pdf", filters);
        entry.embedding_vector = Some(vector);
        entry
    }

    #[tokio::test]
    async fn test_upload_rejects_missing_vector() {
        let index = MemoryVectorIndex::new(3);
        let bare = ChunkedEntry::new("doc-1", "text", 1, 0, "a.pdf", Vec::new());

        assert!(index.upload(&bare).await.is_err());
        assert_eq!(index.len().await, 0);
    }

    #[tokio::test]
    async fn test_upload_rejects_dimension_mismatch() {
        let index = MemoryVectorIndex::new(3);
        let wrong = entry("text", vec![1.0, 0.0], Vec::new());

        let err = index.upload(&wrong).await.unwrap_err();
        assert!(err.to_string().contains("dimension"));
    }

    #[tokio::test]
    async fn test_filtered_search_ranks_by_similarity() {
        let index = MemoryVectorIndex::new(2);
        let legal = vec![MetadataPair::new("department", "legal")];

        index
            .upload(&entry("close match", vec![1.0, 0.0], legal.clone()))
            .await
            .unwrap();
        index
            .upload(&entry("far match", vec![0.0, 1.0], legal.clone()))
            .await
            .unwrap();
        index
            .upload(&entry("other department", vec![1.0, 0.0], vec![
                MetadataPair::new("department", "sales"),
            ]))
            .await
            .unwrap();

        let results = index.search(&[1.0, 0.0], &legal, 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk, "close match");
    }
}
