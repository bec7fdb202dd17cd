//! Consensus aggregation across raters.

use std::collections::{BTreeMap, BTreeSet};

/// Reduce per-rater ratings for one record into a single score.
///
/// Absent ratings are discarded first. If none remain the result is absent.
/// If exactly `expected_count` ratings remain and they are all pairwise
/// distinct, the result is their minimum: when the raters disagree
/// completely, the lowest capability estimate wins. Otherwise the result is
/// the statistical mode, and the smallest mode on a tie. With only two
/// distinct single-count values present (e.g. one rater failed and the
/// others said 3 and 5) the all-distinct rule does not apply and the mode
/// branch resolves to the minimum as well.
pub fn aggregate(ratings: &[Option<u8>], expected_count: usize) -> Option<u8> {
    let values: Vec<u8> = ratings.iter().flatten().copied().collect();
    if values.is_empty() {
        return None;
    }

    let distinct: BTreeSet<u8> = values.iter().copied().collect();
    if values.len() == expected_count && distinct.len() == expected_count {
        return values.iter().copied().min();
    }

    let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
    for v in &values {
        *counts.entry(*v).or_insert(0) += 1;
    }
    let max = counts.values().copied().max()?;
    // BTreeMap iterates ascending, so the first maximal entry is the
    // smallest mode.
    counts
        .into_iter()
        .find(|(_, c)| *c == max)
        .map(|(v, _)| v)
}
