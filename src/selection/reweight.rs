use crate::store::ScoreRecord;
use crate::types::selection_set::QueryContext;

/// Pluggable query-aware reweighting strategy.
///
/// The multiplier only shapes an ephemeral ranking key; the stored
/// [`crate::scoring::QualityScore`] stays query-independent and reusable.
pub trait QueryReweighter {
    fn multiplier(&self, record: &ScoreRecord, query: &QueryContext) -> f32;
}

/// Identity strategy: ranking key equals the composite.
#[derive(Debug, Default)]
pub struct NoReweight;

impl QueryReweighter for NoReweight {
    fn multiplier(&self, _record: &ScoreRecord, _query: &QueryContext) -> f32 {
        1.0
    }
}

/// v0: keyword overlap between query terms and the record's category label
/// plus its metadata keywords, with a bounded boost.
#[derive(Debug)]
pub struct KeywordOverlapReweighter {
    pub boost_per_match: f32,
    pub max_boost: f32,
}

impl Default for KeywordOverlapReweighter {
    fn default() -> Self {
        Self {
            boost_per_match: 0.05,
            max_boost: 0.25,
        }
    }
}

impl QueryReweighter for KeywordOverlapReweighter {
    fn multiplier(&self, record: &ScoreRecord, query: &QueryContext) -> f32 {
        if query.terms.is_empty() {
            return 1.0;
        }

        let category_lower = record.category.to_lowercase();
        let category_terms: Vec<&str> = category_lower
            .split(|c: char| c.is_whitespace() || c == '-' || c == '_' || c == '/')
            .filter(|t| !t.is_empty())
            .collect();

        let mut matches = 0usize;
        for term in &query.terms {
            if category_terms.iter().any(|t| t == term)
                || record.keywords.iter().any(|k| k == term)
            {
                matches += 1;
            }
        }

        let boost = (matches as f32 * self.boost_per_match).min(self.max_boost);
        let multiplier = 1.0 + boost;
        debug_assert!(multiplier >= 1.0);
        multiplier
    }
}
