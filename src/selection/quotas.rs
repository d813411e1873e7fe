use std::collections::{BTreeMap, BTreeSet};

use crate::types::selection_set::CategoryBalance;

/// Per-category slot quotas from a balance target, by largest-remainder
/// apportionment. Remainder ties go to the lexicographically smaller category
/// name so the result is deterministic.
///
/// `Weighted` quotas are computed over the map's categories, present in the
/// corpus or not; an absent category simply cannot fill its quota and the
/// planner reports a degraded balance.
pub fn category_quotas(
    balance: &CategoryBalance,
    target_count: usize,
    present: &BTreeSet<String>,
) -> BTreeMap<String, usize> {
    let weighted: Vec<(String, f32)> = match balance {
        CategoryBalance::Equal => {
            if present.is_empty() {
                return BTreeMap::new();
            }
            let share = 1.0 / present.len() as f32;
            present.iter().map(|c| (c.clone(), share)).collect()
        }
        CategoryBalance::Weighted(weights) => {
            let total: f32 = weights.values().filter(|w| **w > 0.0).sum();
            if total <= 0.0 {
                return BTreeMap::new();
            }
            weights
                .iter()
                .filter(|(_, w)| **w > 0.0)
                .map(|(c, w)| (c.clone(), w / total))
                .collect()
        }
    };

    let mut quotas = BTreeMap::new();
    let mut remainders: Vec<(String, f32)> = Vec::with_capacity(weighted.len());
    let mut assigned = 0usize;

    for (category, share) in weighted {
        let exact = share * target_count as f32;
        let base = exact.floor() as usize;
        assigned += base;
        remainders.push((category.clone(), exact - base as f32));
        quotas.insert(category, base);
    }

    // Hand out the slots the floors dropped, largest remainder first.
    let mut leftover = target_count.saturating_sub(assigned);
    remainders.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    for (category, _) in remainders {
        if leftover == 0 {
            break;
        }
        if let Some(quota) = quotas.get_mut(&category) {
            *quota += 1;
            leftover -= 1;
        }
    }

    debug_assert!(quotas.values().sum::<usize>() <= target_count);
    quotas
}
