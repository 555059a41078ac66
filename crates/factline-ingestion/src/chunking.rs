//! Page text chunking
//!
//! Splits analyzed page text into bounded, overlapping fragments using a
//! recursive separator-priority splitter. Sizes are in characters. Fragments
//! below the configured minimum length are discarded as too short to carry
//! meaning.

use tracing::debug;

use factline_adapters::AnalyzedPage;
use factline_core::{ChunkedEntry, ChunkingConfig, MetadataPair};

use crate::{IngestionError, Result};

// Separator priority for recursive splitting
const SEPARATORS: [&str; 7] = ["\n\n", "\n", ". ", "! ", "? ", "; ", " "];

/// Splits analyzed pages into `ChunkedEntry` values.
pub struct PageChunker {
    config: ChunkingConfig,
}

impl PageChunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate().map_err(IngestionError::Validation)?;
        Ok(Self { config })
    }

    /// Chunk every page of a document, skipping pages with no extractable
    /// text. Chunk indexes restart per page.
    pub fn chunk_pages(
        &self,
        document_id: &str,
        source_file_name: &str,
        metadata: &[MetadataPair],
        pages: &[AnalyzedPage],
    ) -> Vec<ChunkedEntry> {
        let mut entries = Vec::new();

        for page in pages {
            let text = page.text();
            if text.trim().is_empty() {
                debug!(
                    document_id = %document_id,
                    page_number = page.page_number,
                    "Skipping page with no extractable text"
                );
                continue;
            }

            let fragments = self.split_recursive(&text, 0);

            for (chunk_index, fragment) in fragments
                .into_iter()
                .map(|f| f.trim().to_string())
                .filter(|f| f.chars().count() >= self.config.min_chunk_chars)
                .enumerate()
            {
                entries.push(ChunkedEntry::new(
                    document_id,
                    fragment,
                    page.page_number,
                    chunk_index,
                    source_file_name,
                    metadata.to_vec(),
                ));
            }
        }

        debug!(
            document_id = %document_id,
            chunk_count = entries.len(),
            "Document chunked"
        );

        entries
    }

    /// Split text at the highest-priority separator that produces parts,
    /// merging parts back up to the target size; fragments still over the
    /// target recurse with the next separator.
    fn split_recursive(&self, text: &str, separator_idx: usize) -> Vec<String> {
        if text.chars().count() <= self.config.chunk_size_chars {
            return vec![text.to_string()];
        }

        let Some(sep) = SEPARATORS.get(separator_idx) else {
            return self.split_fixed(text);
        };

        let parts: Vec<&str> = text.split(sep).collect();
        if parts.len() == 1 {
            return self.split_recursive(text, separator_idx + 1);
        }

        let mut fragments = Vec::new();
        let mut current = String::new();

        for part in parts {
            let candidate_len = if current.is_empty() {
                part.chars().count()
            } else {
                current.chars().count() + sep.chars().count() + part.chars().count()
            };

            if candidate_len <= self.config.chunk_size_chars {
                if !current.is_empty() {
                    current.push_str(sep);
                }
                current.push_str(part);
            } else {
                if !current.is_empty() {
                    fragments.push(std::mem::take(&mut current));
                }
                current = part.to_string();
            }
        }
        if !current.is_empty() {
            fragments.push(current);
        }

        fragments
            .into_iter()
            .flat_map(|fragment| {
                if fragment.chars().count() > self.config.chunk_size_chars {
                    self.split_recursive(&fragment, separator_idx + 1)
                } else {
                    vec![fragment]
                }
            })
            .collect()
    }

    /// Last resort: fixed-size character windows with overlap.
    fn split_fixed(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = self
            .config
            .chunk_size_chars
            .saturating_sub(self.config.chunk_overlap_chars)
            .max(1);

        let mut fragments = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.config.chunk_size_chars).min(chars.len());
            fragments.push(chars[start..end].iter().collect());
            if end >= chars.len() {
                break;
            }
            start += step;
        }

        fragments
    }
}
