//! Subsequence matching against stored itemsets.

use std::collections::HashSet;

use crate::domain::GoodId;

/// Whether `needle` is a subsequence of `haystack`. Both must be strictly ascending,
/// which makes an element larger than the current target a definitive miss.
pub fn is_subsequence(needle: &[GoodId], haystack: &[GoodId]) -> bool {
    let mut cursor = 0;

    'targets: for target in needle {
        while let Some(item) = haystack.get(cursor) {
            cursor += 1;
            if item == target {
                continue 'targets;
            }
            if item > target {
                return false;
            }
        }
        return false;
    }

    true
}

/// Unions the other items of every pattern that contains `selected`, in scan order.
///
/// `selected` must be sorted ascending. Patterns not longer than the selection are
/// skipped; scanning stops before the next pattern once `cap` candidates are held.
pub fn collect_candidates<'a, I>(selected: &[GoodId], patterns: I, cap: usize) -> Vec<GoodId>
where
    I: IntoIterator<Item = &'a [GoodId]>,
{
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for pattern in patterns {
        if candidates.len() >= cap {
            break;
        }
        if pattern.len() <= selected.len() || !is_subsequence(selected, pattern) {
            continue;
        }
        for item in pattern {
            if !selected.contains(item) && seen.insert(*item) {
                candidates.push(*item);
            }
        }
    }

    candidates
}

/// Keeps the `limit` candidates with the highest `score` (ties keep their order),
/// then returns them ascending by id.
pub fn top_by<F>(mut candidates: Vec<GoodId>, limit: usize, score: F) -> Vec<GoodId>
where
    F: Fn(GoodId) -> u64,
{
    candidates.sort_by(|a, b| score(*b).cmp(&score(*a)));
    candidates.truncate(limit);
    candidates.sort_unstable();
    candidates
}

#[cfg(test)]
mod tests {
    use super::{collect_candidates, is_subsequence, top_by};
    use crate::domain::GoodId;

    fn ids(raw: &[u32]) -> Vec<GoodId> {
        raw.iter().copied().map(GoodId).collect()
    }

    const PATTERNS: &[&[u32]] = &[
        &[1],
        &[2],
        &[3],
        &[1, 2, 3],
        &[1, 2, 3, 4],
        &[1, 2, 3, 4, 5],
        &[1, 2, 4, 8, 9],
        &[2, 3, 4, 5],
        &[3, 4, 5],
        &[4, 5],
        &[5],
    ];

    fn suggested(selected: &[u32]) -> Vec<GoodId> {
        let patterns: Vec<Vec<GoodId>> = PATTERNS.iter().map(|raw| ids(raw)).collect();
        let mut found =
            collect_candidates(&ids(selected), patterns.iter().map(Vec::as_slice), 100);
        found.sort_unstable();
        found
    }

    #[test]
    fn unions_items_of_matching_itemsets() {
        assert_eq!(suggested(&[1]), ids(&[2, 3, 4, 5, 8, 9]));
        assert_eq!(suggested(&[2, 3, 4]), ids(&[1, 5]));
        assert_eq!(suggested(&[7]), ids(&[]));
        assert_eq!(suggested(&[1, 4, 9]), ids(&[2, 8]));
        assert_eq!(suggested(&[1, 2]), ids(&[3, 4, 5, 8, 9]));
        assert_eq!(suggested(&[2, 3]), ids(&[1, 4, 5]));
        assert_eq!(suggested(&[5]), ids(&[1, 2, 3, 4]));
        assert_eq!(suggested(&[4, 5]), ids(&[1, 2, 3]));
        assert_eq!(suggested(&[2, 3, 7]), ids(&[]));
    }

    #[test]
    fn overshoot_is_a_miss() {
        assert!(is_subsequence(&ids(&[2, 8]), &ids(&[1, 2, 4, 8, 9])));
        assert!(!is_subsequence(&ids(&[3]), &ids(&[1, 2, 4, 8, 9])));
        assert!(!is_subsequence(&ids(&[9, 10]), &ids(&[1, 2, 4, 8, 9])));
        assert!(is_subsequence(&[], &ids(&[1])));
    }

    #[test]
    fn stops_scanning_at_cap() {
        let patterns = vec![ids(&[1, 2, 3]), ids(&[1, 4, 5]), ids(&[1, 6, 7])];

        let found = collect_candidates(&ids(&[1]), patterns.iter().map(Vec::as_slice), 3);

        assert_eq!(found, ids(&[2, 3, 4, 5]));
    }

    #[test]
    fn top_by_ranks_then_sorts_by_id() {
        let support = |good: GoodId| [0, 9, 1, 7, 7, 3][good.index()];

        let top = top_by(ids(&[5, 2, 4, 1, 3]), 3, support);

        assert_eq!(top, ids(&[1, 3, 4]));
    }
}
