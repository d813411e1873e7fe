use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

#[derive(Debug, Error)]
pub enum DocumentIdError {
    #[error("Document id must not be empty")]
    Empty,
    #[error("Document id must not contain whitespace: {0:?}")]
    Whitespace(String),
}

impl DocumentId {
    /// Create a DocumentId from the opaque identifier assigned by ingestion.
    pub fn new(raw: impl Into<String>) -> Result<Self, DocumentIdError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(DocumentIdError::Empty);
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(DocumentIdError::Whitespace(raw));
        }
        Ok(DocumentId(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered scoring-algorithm version. A bump marks every score computed under
/// an earlier version as stale until a rerank revisits it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AlgorithmVersion(u32);

impl AlgorithmVersion {
    pub const fn new(n: u32) -> Self {
        AlgorithmVersion(n)
    }

    pub fn bump(self) -> Self {
        AlgorithmVersion(self.0 + 1)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AlgorithmVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Identifier for a rerank job, unique within one engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(u64);

impl JobId {
    pub fn new(n: u64) -> Self {
        JobId(n)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}
