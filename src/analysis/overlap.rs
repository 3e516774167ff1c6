use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::pr::diff::LineRange;
use crate::pr::PullRequest;
use crate::report::types::Verdict;

/// Post-change hunks per file for one PR.
pub type FileHunks = BTreeMap<String, Vec<LineRange>>;

/// Two PRs touching intersecting lines of the same file. `pr_a < pr_b`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlapEdge {
    pub pr_a: u64,
    pub pr_b: u64,
    pub file: String,
    pub range_a: LineRange,
    pub range_b: LineRange,
}

/// Two PRs touching the same files without intersecting lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedFiles {
    pub pr_a: u64,
    pub pr_b: u64,
    pub shared_files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlapAnalysis {
    pub overlaps: Vec<OverlapEdge>,
    pub shared_no_overlap: Vec<SharedFiles>,
}

/// Hunks of every PR eligible for overlap analysis: non-draft, mergeable,
/// and with at least one parsed hunk header. Files without hunk headers are
/// left out. A deletion-only file stays in with no ranges, so it can still
/// be a shared file.
pub fn eligible_hunks(prs: &[PullRequest]) -> BTreeMap<u64, FileHunks> {
    prs.iter()
        .filter(|pr| !pr.is_draft && pr.mergeable == crate::pr::Mergeable::Mergeable)
        .filter_map(|pr| {
            let files: FileHunks = pr
                .files
                .iter()
                .filter(|f| f.is_touched())
                .map(|f| (f.path.clone(), f.hunks.clone()))
                .collect();
            (!files.is_empty()).then_some((pr.number, files))
        })
        .collect()
}

/// Compare every pair of eligible PRs, in ascending number order.
///
/// Each intersecting hunk pair on a shared file is one overlap edge. A pair
/// that shares files but has no intersecting hunk is reported once in
/// `shared_no_overlap`.
pub fn compute_overlaps(eligible: &BTreeMap<u64, FileHunks>) -> OverlapAnalysis {
    let mut analysis = OverlapAnalysis::default();
    let numbers: Vec<u64> = eligible.keys().copied().collect();

    for (i, &pr_a) in numbers.iter().enumerate() {
        for &pr_b in &numbers[i + 1..] {
            let files_a = &eligible[&pr_a];
            let files_b = &eligible[&pr_b];
            let shared: Vec<&String> = files_a.keys().filter(|f| files_b.contains_key(*f)).collect();
            if shared.is_empty() {
                continue;
            }

            let mut has_overlap = false;
            for file in &shared {
                for range_a in &files_a[*file] {
                    for range_b in &files_b[*file] {
                        if range_a.overlaps(range_b) {
                            analysis.overlaps.push(OverlapEdge {
                                pr_a,
                                pr_b,
                                file: (*file).clone(),
                                range_a: *range_a,
                                range_b: *range_b,
                            });
                            has_overlap = true;
                        }
                    }
                }
            }

            if !has_overlap {
                analysis.shared_no_overlap.push(SharedFiles {
                    pr_a,
                    pr_b,
                    shared_files: shared.into_iter().cloned().collect(),
                });
            }
        }
    }
    analysis
}

impl OverlapAnalysis {
    /// PRs that overlap with `number`, ascending.
    pub fn partners(&self, number: u64) -> BTreeSet<u64> {
        self.overlaps
            .iter()
            .filter_map(|o| match (o.pr_a == number, o.pr_b == number) {
                (true, _) => Some(o.pr_b),
                (_, true) => Some(o.pr_a),
                _ => None,
            })
            .collect()
    }

    /// Files on which `number` overlaps with another PR, ascending.
    pub fn overlapping_files(&self, number: u64) -> BTreeSet<&str> {
        self.overlaps
            .iter()
            .filter(|o| o.pr_a == number || o.pr_b == number)
            .map(|o| o.file.as_str())
            .collect()
    }

    pub fn shares_files(&self, number: u64) -> bool {
        self.shared_no_overlap
            .iter()
            .any(|s| s.pr_a == number || s.pr_b == number)
    }

    /// Overlap status of one PR.
    ///
    /// Drafts and conflicting PRs are not applicable, as are PRs that were
    /// not eligible. Otherwise: FAIL on any line overlap, warn when files are
    /// only shared, pass when no other PR touches the same files.
    pub fn verdict(&self, number: u64, applicable: bool, eligible: bool) -> Verdict {
        if !applicable {
            return Verdict::not_applicable();
        }
        let partners = self.partners(number);
        if !partners.is_empty() {
            let partner_str = format_partners(&partners);
            let files: Vec<&str> = self.overlapping_files(number).into_iter().take(2).collect();
            return Verdict::fail(format!("Line overlap with {} on {}", partner_str, files.join(", ")));
        }
        if self.shares_files(number) {
            return Verdict::warn("Shares files but no line overlap");
        }
        if eligible {
            Verdict::pass()
        } else {
            Verdict::not_applicable()
        }
    }
}

/// "#3, #7"
pub fn format_partners(partners: &BTreeSet<u64>) -> String {
    partners
        .iter()
        .map(|p| format!("#{}", p))
        .collect::<Vec<_>>()
        .join(", ")
}
