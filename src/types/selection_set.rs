use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tier::Tier;
use crate::types::identifiers::DocumentId;

/// Normalized query context for query-aware reweighting.
/// Normalization rules:
/// - Lowercase
/// - Split on whitespace
/// - Empty term lists are handled by the reweighter (multiplier 1.0)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryContext {
    pub raw: String,
    pub terms: Vec<String>,
}

impl QueryContext {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let terms = raw
            .to_lowercase()
            .split_whitespace()
            .map(|s| s.to_string())
            .collect();

        Self { raw, terms }
    }
}

/// Desired distribution of selected documents across category labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CategoryBalance {
    /// Equal share per category present in the snapshot.
    Equal,
    /// Explicit per-category weights. Categories absent from the map get no quota
    /// but remain eligible for the global fill pass.
    Weighted(BTreeMap<String, f32>),
}

/// Input to a planning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub target_count: usize,
    pub budget_tokens: usize,
    pub balance: CategoryBalance,
    pub query: Option<QueryContext>,
}

/// One selected document in the output, in final ranking order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedEntry {
    pub id: DocumentId,
    pub category: String,
    pub tier: Tier,
    pub composite: f32,
    /// Ephemeral ranking key: composite after query reweighting. Equals the
    /// composite when no query context was supplied.
    pub ranking_key: f32,
    pub tokens: usize,
}

/// Degradation markers. Selection never fails; it reports what it relaxed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionFlags {
    /// Some category had fewer candidates than its quota; the shortfall was
    /// redistributed via the global fill pass.
    pub degraded_balance: bool,
    /// Fewer than target_count documents fit the token budget.
    pub budget_exhausted: bool,
}

/// The output of a planning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSet {
    pub entries: Vec<SelectedEntry>,

    pub tokens_used: usize,
    pub budget_tokens: usize,

    pub per_category: BTreeMap<String, usize>,
    pub flags: SelectionFlags,

    pub candidates_considered: usize,
    pub excluded_by_budget: usize,

    /// Fingerprint of the score snapshot the plan was computed against.
    pub snapshot_fingerprint: String,
}
