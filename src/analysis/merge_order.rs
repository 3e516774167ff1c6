use std::collections::{BTreeMap, BTreeSet};

use super::overlap::OverlapEdge;

/// A clean-mergeable PR: non-draft, no blockers, no conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeCandidate {
    pub number: u64,
    pub size_score: u64,
}

/// Greedy merge sequence for the candidates.
///
/// Builds an undirected graph with an edge between two candidates that
/// overlap, then repeatedly takes the remaining PR with the fewest remaining
/// neighbors, breaking ties by smaller size score and then by PR number.
/// Merging low-overlap, small PRs first keeps rebases for the rest cheap.
/// The result is a permutation of the candidate numbers.
pub fn plan_merge_order(candidates: &[MergeCandidate], overlaps: &[OverlapEdge]) -> Vec<u64> {
    let sizes: BTreeMap<u64, u64> = candidates.iter().map(|c| (c.number, c.size_score)).collect();

    let mut graph: BTreeMap<u64, BTreeSet<u64>> = BTreeMap::new();
    for edge in overlaps {
        if sizes.contains_key(&edge.pr_a) && sizes.contains_key(&edge.pr_b) {
            graph.entry(edge.pr_a).or_default().insert(edge.pr_b);
            graph.entry(edge.pr_b).or_default().insert(edge.pr_a);
        }
    }

    let mut remaining: BTreeSet<u64> = sizes.keys().copied().collect();
    let mut ordered = Vec::with_capacity(remaining.len());

    loop {
        let Some(best) = remaining.iter().copied().min_by_key(|n| {
            let neighbors = graph
                .get(n)
                .map(|adj| adj.intersection(&remaining).count())
                .unwrap_or(0);
            (neighbors, sizes[n], *n)
        }) else {
            break;
        };
        ordered.push(best);
        remaining.remove(&best);
    }

    ordered
}
