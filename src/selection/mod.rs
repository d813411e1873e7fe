//! The selection planner: bounded, category-balanced subsets of the corpus.
//!
//! A plan is computed against one [`ScoreSnapshot`] and is deterministic for
//! identical inputs. Degradation (thin categories, tight budgets) sets flags
//! on the output; planning never fails.

pub mod quotas;
pub mod reweight;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::store::{ScoreRecord, ScoreSnapshot};
use crate::types::selection_set::{
    SelectedEntry, SelectionFlags, SelectionRequest, SelectionSet,
};
pub use quotas::category_quotas;
pub use reweight::{KeywordOverlapReweighter, NoReweight, QueryReweighter};

struct Ranked<'a> {
    record: &'a ScoreRecord,
    key: f32,
}

pub struct SelectionPlanner<R> {
    reweighter: R,
}

impl Default for SelectionPlanner<KeywordOverlapReweighter> {
    fn default() -> Self {
        Self {
            reweighter: KeywordOverlapReweighter::default(),
        }
    }
}

impl<R> SelectionPlanner<R>
where
    R: QueryReweighter,
{
    pub fn new(reweighter: R) -> Self {
        Self { reweighter }
    }

    pub fn plan(&self, snapshot: &ScoreSnapshot, request: &SelectionRequest) -> SelectionSet {
        // 1. Ranking Phase
        // Ephemeral keys only; stored scores are never touched.
        let mut ranked: Vec<Ranked<'_>> = snapshot
            .records()
            .iter()
            .map(|record| {
                let key = match &request.query {
                    Some(query) => {
                        record.score.composite * self.reweighter.multiplier(record, query)
                    }
                    None => record.score.composite,
                };
                Ranked { record, key }
            })
            .collect();

        // 2. Ordering Phase
        // Sort by (key desc, recency desc, authority desc, id asc)
        ranked.sort_by(|a, b| {
            let key_cmp = b.key.partial_cmp(&a.key).unwrap_or(Ordering::Equal);
            key_cmp
                .then_with(|| b.record.collected_at.cmp(&a.record.collected_at))
                .then_with(|| {
                    b.record
                        .score
                        .subscores
                        .source_authority
                        .partial_cmp(&a.record.score.subscores.source_authority)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.record.id.cmp(&b.record.id))
        });

        debug_assert!(ranked
            .windows(2)
            .all(|w| w[0].key >= w[1].key || w[0].key.partial_cmp(&w[1].key).is_none()));

        // 3. Quota Phase
        let present: BTreeSet<String> = ranked
            .iter()
            .map(|r| r.record.category.clone())
            .collect();
        let quotas = category_quotas(&request.balance, request.target_count, &present);

        let mut candidates_per_category: BTreeMap<&str, usize> = BTreeMap::new();
        for r in &ranked {
            *candidates_per_category
                .entry(r.record.category.as_str())
                .or_insert(0) += 1;
        }
        let degraded_balance = quotas.iter().any(|(category, quota)| {
            *quota > 0
                && candidates_per_category
                    .get(category.as_str())
                    .copied()
                    .unwrap_or(0)
                    < *quota
        });

        let mut selected = vec![false; ranked.len()];
        let mut taken_per_category: BTreeMap<&str, usize> = BTreeMap::new();
        let mut tokens_used = 0usize;
        let mut selected_count = 0usize;

        // Greedy in global order; a document whose size would overflow the
        // remaining budget is skipped whole, never truncated.
        for (i, r) in ranked.iter().enumerate() {
            if selected_count == request.target_count {
                break;
            }
            let quota = quotas.get(&r.record.category).copied().unwrap_or(0);
            let taken = taken_per_category
                .get(r.record.category.as_str())
                .copied()
                .unwrap_or(0);
            if taken >= quota {
                continue;
            }
            if tokens_used + r.record.tokens <= request.budget_tokens {
                selected[i] = true;
                selected_count += 1;
                tokens_used += r.record.tokens;
                *taken_per_category
                    .entry(r.record.category.as_str())
                    .or_insert(0) += 1;
            }
        }

        // 4. Fill Phase
        // Remaining budget goes to global rank regardless of quota.
        let mut excluded_by_budget = 0usize;
        for (i, r) in ranked.iter().enumerate() {
            if selected_count == request.target_count {
                break;
            }
            if selected[i] {
                continue;
            }
            if tokens_used + r.record.tokens <= request.budget_tokens {
                selected[i] = true;
                selected_count += 1;
                tokens_used += r.record.tokens;
            } else {
                excluded_by_budget += 1;
            }
        }

        let flags = SelectionFlags {
            degraded_balance,
            budget_exhausted: selected_count < request.target_count && excluded_by_budget > 0,
        };
        if flags.degraded_balance {
            tracing::warn!(
                target_count = request.target_count,
                selected = selected_count,
                "category balance degraded: quota shortfall redistributed"
            );
        }

        // 5. Output, in global ranking order
        let mut entries = Vec::with_capacity(selected_count);
        let mut per_category: BTreeMap<String, usize> = BTreeMap::new();
        for (i, r) in ranked.iter().enumerate() {
            if !selected[i] {
                continue;
            }
            *per_category.entry(r.record.category.clone()).or_insert(0) += 1;
            entries.push(SelectedEntry {
                id: r.record.id.clone(),
                category: r.record.category.clone(),
                tier: r.record.tier,
                composite: r.record.score.composite,
                ranking_key: r.key,
                tokens: r.record.tokens,
            });
        }

        debug_assert!(tokens_used <= request.budget_tokens);
        debug_assert_eq!(entries.len(), selected_count);

        SelectionSet {
            entries,
            tokens_used,
            budget_tokens: request.budget_tokens,
            per_category,
            flags,
            candidates_considered: ranked.len(),
            excluded_by_budget,
            snapshot_fingerprint: snapshot.fingerprint().to_string(),
        }
    }
}
