//! Document layout analysis contract
//!
//! The real analyzer is an external document-intelligence service; the
//! pipeline only needs pages of extracted text lines back.

use async_trait::async_trait;

use crate::Result;

/// One analyzed page: extracted text lines in reading order.
#[derive(Debug, Clone)]
pub struct AnalyzedPage {
    pub page_number: u32,
    pub lines: Vec<String>,
}

impl AnalyzedPage {
    /// Page text as the chunker consumes it; pages with no extractable
    /// text yield an empty string and are skipped upstream.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Narrow analysis contract.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    async fn analyze(&self, content: &[u8]) -> Result<Vec<AnalyzedPage>>;
}

/// Plain-text analyzer: form feeds delimit pages, newlines delimit lines.
/// Stands in for the external layout service in tests and dev mode.
#[derive(Default)]
pub struct PlainTextAnalyzer;

impl PlainTextAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentAnalyzer for PlainTextAnalyzer {
    async fn analyze(&self, content: &[u8]) -> Result<Vec<AnalyzedPage>> {
        let text = String::from_utf8_lossy(content);

        Ok(text
            .split('\u{0C}')
            .enumerate()
            .map(|(i, page)| AnalyzedPage {
                page_number: i as u32 + 1,
                lines: page.lines().map(str::to_string).collect(),
            })
            .collect())
    }
}
