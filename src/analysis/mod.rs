pub mod merge_order;
pub mod overlap;
pub mod supersession;

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info_span};

use crate::config::Config;
use crate::pr::PullRequest;

use overlap::OverlapAnalysis;

/// Findings that need the whole PR set rather than a single PR.
#[derive(Debug, Clone, Default)]
pub struct CrossPrAnalysis {
    /// PR number → newer PR that may supersede it
    pub superseded: BTreeMap<u64, u64>,
    pub overlap: OverlapAnalysis,
    /// PRs that took part in overlap analysis
    pub eligible: BTreeSet<u64>,
}

/// Run supersession detection and overlap analysis across all PRs.
pub fn run_all(prs: &[PullRequest], config: &Config) -> CrossPrAnalysis {
    let superseded = {
        let _span = info_span!("analyze", analysis = "supersession").entered();
        supersession::detect_superseded(prs, config.supersession.min_title_len)
    };

    let (eligible, overlap) = {
        let _span = info_span!("analyze", analysis = "overlap").entered();
        let hunks = overlap::eligible_hunks(prs);
        let eligible: BTreeSet<u64> = hunks.keys().copied().collect();
        (eligible, overlap::compute_overlaps(&hunks))
    };

    debug!(
        superseded = superseded.len(),
        eligible = eligible.len(),
        overlaps = overlap.overlaps.len(),
        shared_no_overlap = overlap.shared_no_overlap.len(),
        "cross-PR analysis complete"
    );

    CrossPrAnalysis {
        superseded,
        overlap,
        eligible,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::types::tests::test_pull_request;
    use crate::pr::types::DiffFile;

    #[test]
    fn test_run_all_on_empty_set() {
        let analysis = run_all(&[], &Config::default());
        assert!(analysis.superseded.is_empty());
        assert!(analysis.eligible.is_empty());
        assert!(analysis.overlap.overlaps.is_empty());
    }

    #[test]
    fn test_run_all_combines_supersession_and_overlap() {
        let mut first = test_pull_request(1, "2024-06-01T00:00:00Z");
        first.branch = "feat/login".to_string();
        first.created_at = "2024-05-01T00:00:00Z".to_string();
        first.files = vec![DiffFile::from_patch("x.py", "@@ -1,5 +1,5 @@\n")];
        let mut second = test_pull_request(2, "2024-06-01T00:00:00Z");
        second.branch = "feat/login-v2".to_string();
        second.created_at = "2024-05-02T00:00:00Z".to_string();
        second.files = vec![DiffFile::from_patch("x.py", "@@ -3,2 +3,2 @@\n")];

        let analysis = run_all(&[first, second], &Config::default());
        assert_eq!(analysis.superseded.get(&1), Some(&2));
        assert_eq!(analysis.eligible.len(), 2);
        assert_eq!(analysis.overlap.overlaps.len(), 1);
    }
}
