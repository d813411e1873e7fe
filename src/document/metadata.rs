use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Number(i64),
}

/// Free-form attributes attached by ingestion (title, author, tags, ...).
/// BTreeMap keeps serialization order deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    inner: BTreeMap<String, MetadataValue>,
}

impl Metadata {
    pub fn new() -> Self {
        Metadata {
            inner: BTreeMap::new(),
        }
    }

    pub fn insert_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner
            .insert(key.into(), MetadataValue::String(value.into()));
    }

    pub fn insert_number(&mut self, key: impl Into<String>, value: i64) {
        self.inner.insert(key.into(), MetadataValue::Number(value));
    }

    // Merge another metadata into this one (overriding common keys)
    pub fn merge(&mut self, other: Metadata) {
        for (k, v) in other.inner {
            self.inner.insert(k, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.inner.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.inner.iter()
    }

    /// All string values, lowercased and split on whitespace. Used for
    /// query-keyword overlap during selection reweighting.
    pub fn keyword_terms(&self) -> Vec<String> {
        let mut terms = Vec::new();
        for value in self.inner.values() {
            if let MetadataValue::String(s) = value {
                terms.extend(s.to_lowercase().split_whitespace().map(|t| t.to_string()));
            }
        }
        terms
    }
}
