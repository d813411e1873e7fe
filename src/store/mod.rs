//! The score arena: one record per document, replaced wholesale on update.
//!
//! A reader never observes a half-updated score; the record is the unit of
//! replacement. Staleness is derived from the stored algorithm version, so a
//! version bump marks the whole corpus stale without touching any record.

pub mod persistence;

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::document::{Document, Provenance};
use crate::scoring::QualityScore;
use crate::tier::{Tier, TierCounts};
use crate::types::identifiers::{AlgorithmVersion, DocumentId};

pub use persistence::{StoreError, StoreManifest};

/// Denormalized per-document record. Carries everything the selection planner
/// needs so a plan reads only the snapshot, never the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub id: DocumentId,
    pub category: String,
    pub domain: String,
    pub provenance: Provenance,
    pub collected_at: DateTime<Utc>,
    pub tokens: usize,
    pub char_len: usize,
    /// Metadata keyword terms, lowercased; consumed by query reweighting.
    pub keywords: Vec<String>,
    pub score: QualityScore,
    pub tier: Tier,
}

impl ScoreRecord {
    pub fn new(doc: &Document, score: QualityScore, tier: Tier) -> Self {
        ScoreRecord {
            id: doc.id.clone(),
            category: doc.category.clone(),
            domain: doc.domain.clone(),
            provenance: doc.provenance,
            collected_at: doc.collected_at,
            tokens: doc.approx_tokens(),
            char_len: doc.char_len(),
            keywords: doc.metadata.keyword_terms(),
            score,
            tier,
        }
    }
}

#[derive(Debug, Default)]
pub struct ScoreStore {
    records: RwLock<BTreeMap<DocumentId, ScoreRecord>>,
}

impl ScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<DocumentId, ScoreRecord>> {
        self.records.read().expect("score store lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<DocumentId, ScoreRecord>> {
        self.records.write().expect("score store lock poisoned")
    }

    /// Whole-record replace. Tier transitions are logged, never blocked.
    pub fn upsert(&self, record: ScoreRecord) {
        let id = record.id.clone();
        let new_tier = record.tier;
        let previous = self.write().insert(id.clone(), record);
        if let Some(prev) = previous {
            if prev.tier != new_tier {
                tracing::info!(
                    document = %id,
                    from = %prev.tier,
                    to = %new_tier,
                    "tier transition"
                );
            }
        }
    }

    pub fn get(&self, id: &DocumentId) -> Option<ScoreRecord> {
        self.read().get(id).cloned()
    }

    /// Stored algorithm version, for the rerank idempotence check.
    pub fn current_version(&self, id: &DocumentId) -> Option<AlgorithmVersion> {
        self.read().get(id).map(|r| r.score.algorithm_version)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn stale_ids(&self, current: AlgorithmVersion) -> Vec<DocumentId> {
        self.read()
            .values()
            .filter(|r| r.score.is_stale(current))
            .map(|r| r.id.clone())
            .collect()
    }

    pub fn stale_count(&self, current: AlgorithmVersion) -> usize {
        self.read()
            .values()
            .filter(|r| r.score.is_stale(current))
            .count()
    }

    pub fn tier_counts(&self) -> TierCounts {
        let mut counts = TierCounts::default();
        for record in self.read().values() {
            counts.increment(record.tier);
        }
        counts
    }

    /// Consistent snapshot: planning against it never mixes pre- and
    /// post-rerank scores.
    pub fn snapshot(&self) -> ScoreSnapshot {
        // BTreeMap iteration is already id-sorted
        let records: Vec<ScoreRecord> = self.read().values().cloned().collect();
        let fingerprint = fingerprint_records(&records);
        ScoreSnapshot {
            records,
            fingerprint,
        }
    }

    pub(crate) fn replace_all(&self, records: Vec<ScoreRecord>) {
        let mut map = self.write();
        map.clear();
        for record in records {
            map.insert(record.id.clone(), record);
        }
    }
}

/// An immutable, fingerprinted copy of the score arena.
#[derive(Debug, Clone)]
pub struct ScoreSnapshot {
    records: Vec<ScoreRecord>,
    fingerprint: String,
}

impl ScoreSnapshot {
    /// Records in ascending id order.
    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    pub fn get(&self, id: &DocumentId) -> Option<&ScoreRecord> {
        self.records
            .binary_search_by(|r| r.id.cmp(id))
            .ok()
            .map(|i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// sha256 over sorted `id:algorithm_version:composite-bits` lines. Composite
/// goes in as raw bits so the fingerprint is exact, not a decimal rendering.
pub(crate) fn fingerprint_records(records: &[ScoreRecord]) -> String {
    debug_assert!(records.windows(2).all(|w| w[0].id < w[1].id));
    let mut hasher = Sha256::new();
    for record in records {
        let line = format!(
            "{}:{}:{:08x}\n",
            record.id.as_str(),
            record.score.algorithm_version,
            record.score.composite.to_bits()
        );
        hasher.update(line.as_bytes());
    }
    format!("sha256:{}", hex::encode(hasher.finalize()))
}
