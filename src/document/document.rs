use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::metadata::Metadata;
use crate::types::identifiers::DocumentId;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Content must be valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// How a document entered the corpus. Curated sources get an authority boost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    Curated,
    Collected,
}

/// The atomic unit of content, owned by the ingestion subsystem.
///
/// Read-only from the engine's perspective; scores and tiers live in the
/// score store, never on the document itself. The `category` label is assigned
/// by the external categorization step and is never modified here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub source: String,
    pub domain: String,
    pub category: String,
    pub provenance: Provenance,
    pub collected_at: DateTime<Utc>,
    pub content: String,
    pub metadata: Metadata,
}

impl Document {
    /// Ingest raw bytes into a Document.
    ///
    /// This is the ONLY way to construct a Document.
    /// It enforces the UTF-8 invariant up front so scoring never has to.
    #[allow(clippy::too_many_arguments)]
    pub fn ingest(
        id: DocumentId,
        source: String,
        domain: String,
        category: String,
        provenance: Provenance,
        collected_at: DateTime<Utc>,
        raw_content: Vec<u8>,
        metadata: Metadata,
    ) -> Result<Self, DocumentError> {
        let content = String::from_utf8(raw_content)?;

        Ok(Document {
            id,
            source,
            domain,
            category,
            provenance,
            collected_at,
            content,
            metadata,
        })
    }

    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Approximate token count: tokens(content) := ceil(len(content) / 4).
    pub fn approx_tokens(&self) -> usize {
        if self.content.is_empty() {
            0
        } else {
            (self.content.len() + 3) / 4
        }
    }
}
