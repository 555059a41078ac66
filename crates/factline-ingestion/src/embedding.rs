//! Embedding enrichment
//!
//! Attaches vectors to chunks in bounded batches. A failed batch is logged
//! and its chunks left vectorless rather than aborting the document; the
//! vector-completeness filter then keeps partially enriched chunks away
//! from index upload, where a dimension mismatch is a hard failure.

use std::sync::Arc;
use tracing::{debug, warn};

use factline_adapters::EmbeddingClient;
use factline_core::{ChunkedEntry, EmbeddingConfig};

/// Enriches chunk batches with embedding vectors.
pub struct EmbeddingEnricher {
    client: Arc<dyn EmbeddingClient>,
    config: EmbeddingConfig,
}

impl EmbeddingEnricher {
    pub fn new(client: Arc<dyn EmbeddingClient>, config: EmbeddingConfig) -> Self {
        Self { client, config }
    }

    /// Embed all chunks with text, in batches of at most the configured
    /// size. Blank chunks are never sent to the backend. Returns the number
    /// of failed batches.
    pub async fn enrich(&self, chunks: &mut [ChunkedEntry]) -> usize {
        let embeddable: Vec<usize> = chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| c.has_text())
            .map(|(i, _)| i)
            .collect();

        let mut failed_batches = 0;

        for batch in embeddable.chunks(self.config.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|&i| chunks[i].chunk.clone()).collect();

            match self.client.embed_batch(&texts).await {
                Ok(vectors) if vectors.len() == batch.len() => {
                    for (&i, vector) in batch.iter().zip(vectors) {
                        chunks[i].embedding_vector = Some(vector);
                    }
                }
                Ok(vectors) => {
                    warn!(
                        expected = batch.len(),
                        received = vectors.len(),
                        "Embedding backend returned a short batch; leaving batch vectorless"
                    );
                    failed_batches += 1;
                }
                Err(e) => {
                    warn!(
                        batch_size = batch.len(),
                        error = %e,
                        "Embedding batch failed; continuing with remaining batches"
                    );
                    failed_batches += 1;
                }
            }
        }

        debug!(
            chunk_count = chunks.len(),
            embeddable = embeddable.len(),
            failed_batches,
            "Embedding enrichment finished"
        );

        failed_batches
    }

    /// Partition chunks into index-ready entries and rejects. Only entries
    /// with a vector of the configured dimension ever reach upload.
    pub fn vector_complete(&self, chunks: Vec<ChunkedEntry>) -> (Vec<ChunkedEntry>, usize) {
        let total = chunks.len();
        let ready: Vec<ChunkedEntry> = chunks
            .into_iter()
            .filter(|c| c.has_vector_of(self.config.dimension))
            .collect();
        let rejected = total - ready.len();

        if rejected > 0 {
            warn!(rejected, "Dropping chunks without a complete vector before index upload");
        }

        (ready, rejected)
    }
}
