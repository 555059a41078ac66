//! Citation post-processing for model answers
//!
//! The generative model is instructed to emit prose with numbered bracket
//! placeholders (`[1]`) followed by a structured manifest fenced by literal
//! `<FACT_MAP_JSON>...</FACT_MAP_JSON>` tags. Raw model output cannot be
//! trusted to have performed the substitution itself, so this module
//! deterministically reconciles the two into the fixed citation syntax.
//!
//! Citation formatting is best-effort cosmetic enrichment: nothing here
//! ever returns an error to the caller, and citations are never fabricated.
//! When the manifest is absent or malformed the narrative passes through.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

const UNKNOWN_FILE: &str = "UNKNOWN_FILE";
const UNKNOWN_PAGES: &str = "N/A";
const UNKNOWN_ID: &str = "UNKNOWN_ID";

// Fixed, controlled tag format; a dedicated parser replaces this if the
// schema ever grows.
static FACT_MAP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<FACT_MAP_JSON>(.*?)</FACT_MAP_JSON>").expect("fact map pattern is valid")
});

/// One manifest record, parsed from the model's citation block.
///
/// Ephemeral: consumed immediately to rewrite placeholders, never
/// persisted. Every field tolerates absence; the output format substitutes
/// fixed fallbacks so downstream parsing stays stable.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationManifestEntry {
    pub citation_id: Option<String>,
    pub document_filename: Option<String>,
    pub page_numbers: Option<String>,
    pub individual_page_numbers: Option<String>,
    pub document_id: Option<String>,
}

impl CitationManifestEntry {
    /// Render the fixed-syntax citation string. No field is ever omitted.
    fn render(&self) -> String {
        format!(
            "::(Source: [{}], Pages {}|{}|documentId={})",
            self.document_filename.as_deref().unwrap_or(UNKNOWN_FILE),
            self.page_numbers.as_deref().unwrap_or(UNKNOWN_PAGES),
            self.individual_page_numbers
                .as_deref()
                .unwrap_or(UNKNOWN_PAGES),
            self.document_id.as_deref().unwrap_or(UNKNOWN_ID),
        )
    }
}

/// Rewrite bracket placeholders in a raw model answer into the compliant
/// citation syntax.
pub fn format_citations(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let Some(captures) = FACT_MAP_RE.captures(raw) else {
        // No manifest: partial compliance beats blocking the response.
        return raw.trim().to_string();
    };

    let tag_match = captures.get(0).expect("whole-pattern match exists");
    let narrative = &raw[..tag_match.start()];
    let manifest_json = captures.get(1).map(|m| m.as_str()).unwrap_or("");

    let entries: Vec<CitationManifestEntry> = match serde_json::from_str(manifest_json) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Malformed citation manifest; returning narrative unmodified");
            return narrative.trim().to_string();
        }
    };

    debug!(citation_count = entries.len(), "Substituting citations");

    let mut result = narrative.to_string();
    for entry in &entries {
        let Some(id) = entry.citation_id.as_deref() else {
            warn!("Citation record without citationId skipped");
            continue;
        };

        // Literal pattern match: every occurrence of the placeholder is
        // replaced, not just the first.
        let placeholder = format!("[{}]", id);
        result = result.replace(&placeholder, &entry.render());
    }

    result.trim().to_string()
}
