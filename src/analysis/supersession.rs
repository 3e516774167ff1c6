use std::collections::BTreeMap;

use crate::pr::PullRequest;
use crate::util::parse_timestamp;

/// Map of PR number to the newer PR that may supersede it.
///
/// For each PR, the other PRs are scanned in input order and the first one
/// created strictly later that looks like a successor wins:
/// - its branch contains this PR's branch (e.g. `feat/foo` → `feat/foo-v2`), or
/// - both titles are longer than `min_title_len` and one contains the other.
///
/// PRs without a parsable creation time are never compared.
pub fn detect_superseded(prs: &[PullRequest], min_title_len: usize) -> BTreeMap<u64, u64> {
    let candidates: Vec<_> = prs
        .iter()
        .map(|pr| {
            (
                pr,
                parse_timestamp(&pr.created_at),
                pr.title.to_lowercase(),
            )
        })
        .collect();

    let mut superseded = BTreeMap::new();
    for (pr, created, title) in &candidates {
        let Some(created) = created else { continue };

        for (other, other_created, other_title) in &candidates {
            if other.number == pr.number {
                continue;
            }
            let Some(other_created) = other_created else { continue };
            if other_created <= created {
                continue;
            }

            let branch_successor = !pr.branch.is_empty()
                && pr.branch != other.branch
                && other.branch.contains(pr.branch.as_str());

            let title_successor = title.chars().count() > min_title_len
                && other_title.chars().count() > min_title_len
                && (other_title.contains(title.as_str()) || title.contains(other_title.as_str()));

            if branch_successor || title_successor {
                superseded.insert(pr.number, other.number);
                break;
            }
        }
    }
    superseded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::types::tests::test_pull_request;

    fn pr(number: u64, branch: &str, title: &str, created: &str) -> PullRequest {
        let mut pr = test_pull_request(number, "2024-06-01T00:00:00Z");
        pr.branch = branch.to_string();
        pr.title = title.to_string();
        pr.created_at = created.to_string();
        pr
    }

    #[test]
    fn test_v2_branch_supersedes() {
        let prs = vec![
            pr(1, "feat/login", "Add login", "2024-05-01T00:00:00Z"),
            pr(2, "feat/login-v2", "Login again", "2024-05-10T00:00:00Z"),
        ];
        let superseded = detect_superseded(&prs, 15);
        assert_eq!(superseded.get(&1), Some(&2));
        assert!(!superseded.contains_key(&2));
    }

    #[test]
    fn test_older_successor_is_ignored() {
        let prs = vec![
            pr(1, "feat/login-v2", "a", "2024-05-10T00:00:00Z"),
            pr(2, "feat/login", "b", "2024-05-01T00:00:00Z"),
        ];
        assert_eq!(detect_superseded(&prs, 15).get(&2), Some(&1));
        assert!(!detect_superseded(&prs, 15).contains_key(&1));
    }

    #[test]
    fn test_identical_branches_do_not_supersede() {
        let prs = vec![
            pr(1, "feat/x", "a", "2024-05-01T00:00:00Z"),
            pr(2, "feat/x", "b", "2024-05-02T00:00:00Z"),
        ];
        assert!(detect_superseded(&prs, 15).is_empty());
    }

    #[test]
    fn test_similar_long_titles_supersede() {
        let prs = vec![
            pr(1, "a", "Refactor the cache layer", "2024-05-01T00:00:00Z"),
            pr(2, "b", "[v2] refactor the cache layer for tenants", "2024-05-02T00:00:00Z"),
        ];
        assert_eq!(detect_superseded(&prs, 15).get(&1), Some(&2));
    }

    #[test]
    fn test_short_titles_are_not_compared() {
        let prs = vec![
            pr(1, "a", "Fix bug", "2024-05-01T00:00:00Z"),
            pr(2, "b", "Fix bug in parser", "2024-05-02T00:00:00Z"),
        ];
        assert!(detect_superseded(&prs, 15).is_empty());
    }

    #[test]
    fn test_same_creation_time_is_not_newer() {
        let prs = vec![
            pr(1, "feat/login", "a", "2024-05-01T00:00:00Z"),
            pr(2, "feat/login-v2", "b", "2024-05-01T00:00:00Z"),
        ];
        assert!(detect_superseded(&prs, 15).is_empty());
    }

    #[test]
    fn test_first_match_wins_in_input_order() {
        let prs = vec![
            pr(1, "feat/login", "a", "2024-05-01T00:00:00Z"),
            pr(3, "feat/login-v3", "c", "2024-05-20T00:00:00Z"),
            pr(2, "feat/login-v2", "b", "2024-05-10T00:00:00Z"),
        ];
        assert_eq!(detect_superseded(&prs, 15).get(&1), Some(&3));
    }

    #[test]
    fn test_missing_creation_time_is_skipped() {
        let prs = vec![
            pr(1, "feat/login", "a", ""),
            pr(2, "feat/login-v2", "b", "2024-05-10T00:00:00Z"),
        ];
        assert!(detect_superseded(&prs, 15).is_empty());
    }
}
