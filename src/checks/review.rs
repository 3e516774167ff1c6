use regex::Regex;
use std::collections::BTreeSet;

use crate::config::{ConfigError, ReviewConfig, ReviewMode};
use crate::pr::types::{InlineComment, PrComment, Review};
use crate::report::types::{CommentExcerpt, Status, Verdict};
use crate::util::{strip_emphasis, summarize, truncate_chars};

/// Distinct inline-comment paths named in a detail.
const MAX_LISTED_PATHS: usize = 2;

/// Finds genuine blocker sections in automated review comments.
///
/// Everything it matches on comes from configuration: which logins count as
/// automation, what a section heading looks like, which section titles are
/// inspected, and which keywords make a finding high severity.
#[derive(Debug, Clone)]
pub struct BlockerMatcher {
    bot_markers: Vec<String>,
    heading: Regex,
    sections: Regex,
    keywords: Vec<Regex>,
    none_markers: Vec<String>,
    excerpt_chars: usize,
}

impl BlockerMatcher {
    pub fn from_config(config: &ReviewConfig) -> Result<Self, ConfigError> {
        let heading = compile("review.section_heading", &format!("(?m){}", config.section_heading))?;

        let names = config
            .blocker_sections
            .iter()
            .map(|name| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");
        // An empty alternation would match every heading
        let names = if names.is_empty() { "[^\\s\\S]".to_string() } else { names };
        let sections = compile(
            "review.blocker_sections",
            &format!("(?mi){}[^\\n]*?(?P<name>{})[^\\n]*", config.section_heading, names),
        )?;

        let keywords = config
            .severity_keywords
            .iter()
            .map(|pattern| compile("review.severity_keywords", &format!("(?i){}", pattern)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            bot_markers: config.bot_markers.iter().map(|m| m.to_lowercase()).collect(),
            heading,
            sections,
            keywords,
            none_markers: config.none_markers.iter().map(|m| m.to_lowercase()).collect(),
            excerpt_chars: config.excerpt_chars,
        })
    }

    pub fn is_bot(&self, login: &str) -> bool {
        let login = login.to_lowercase();
        !login.is_empty() && self.bot_markers.iter().any(|marker| login.contains(marker.as_str()))
    }

    /// Blocker sections of `body` as `(section title, content)` pairs. A
    /// section runs from its heading to the next heading of the same or a
    /// higher level, or the end. Deeper subheadings stay in the content.
    pub fn sections<'a>(&self, body: &'a str) -> Vec<(&'a str, &'a str)> {
        self.sections
            .captures_iter(body)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let name = caps.name("name")?.as_str();
                let level = heading_level(whole.as_str());
                let start = whole.end();
                let end = self.section_end(body, start, level);
                Some((name, &body[start..end.max(start)]))
            })
            .collect()
    }

    fn section_end(&self, body: &str, from: usize, level: usize) -> usize {
        let mut pos = from;
        while let Some(m) = self.heading.find_at(body, pos) {
            if heading_level(m.as_str()) <= level {
                return m.start();
            }
            pos = m.end().max(pos + 1);
            if pos > body.len() {
                break;
            }
        }
        body.len()
    }

    /// A section counts only if it says something other than "None" and
    /// mentions at least one high-severity keyword.
    pub fn is_blocker(&self, content: &str) -> bool {
        let stripped = strip_emphasis(content);
        let normalized = stripped
            .trim()
            .trim_start_matches(['-', '*', ' '])
            .trim()
            .trim_end_matches('.')
            .to_lowercase();
        if normalized.is_empty() || self.none_markers.contains(&normalized) {
            return false;
        }
        self.keywords.iter().any(|keyword| keyword.is_match(&stripped))
    }

    /// Summaries of every genuine blocker section in `body`.
    pub fn find_blockers(&self, body: &str) -> Vec<String> {
        self.sections(body)
            .into_iter()
            .filter(|(_, content)| self.is_blocker(content))
            .map(|(name, content)| {
                format!("{}: {}", name, summarize(&strip_emphasis(content), self.excerpt_chars))
            })
            .collect()
    }
}

/// Number of leading `#`s of a heading line.
fn heading_level(heading: &str) -> usize {
    heading.trim_start().chars().take_while(|c| *c == '#').count()
}

fn compile(field: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        field,
        pattern: pattern.to_string(),
        source,
    })
}

/// Review-check behavior selected by `review.mode`.
#[derive(Debug, Clone)]
pub struct ReviewPolicy {
    pub mode: ReviewMode,
    pub matcher: BlockerMatcher,
    comment_excerpt_chars: usize,
    review_excerpt_chars: usize,
    recent_count: usize,
}

impl ReviewPolicy {
    pub fn from_config(config: &ReviewConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            mode: config.mode,
            matcher: BlockerMatcher::from_config(config)?,
            comment_excerpt_chars: config.comment_excerpt_chars,
            review_excerpt_chars: config.review_excerpt_chars,
            recent_count: config.recent_count,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub verdict: Verdict,
    /// Populated only in defer mode
    pub comments_for_review: Vec<CommentExcerpt>,
}

/// Evaluate reviews, inline threads and PR comments.
///
/// Unresolved CHANGES_REQUESTED and open inline threads always fail. What
/// happens with PR comments depends on the policy mode: `judge` fails on
/// high-severity blocker sections in the latest bot comment, `defer` hands
/// recent excerpts to a downstream reviewer as `needs_review`.
pub fn check_reviews(
    policy: &ReviewPolicy,
    reviews: &[Review],
    review_comments: &[InlineComment],
    comments: &[PrComment],
) -> ReviewOutcome {
    let mut issues = Vec::new();

    let unresolved = unresolved_reviewers(reviews);
    if !unresolved.is_empty() {
        let names: Vec<String> = unresolved.iter().map(|u| format!("@{}", u)).collect();
        issues.push(format!("CHANGES_REQUESTED from {}", names.join(", ")));
    }

    if let Some(threads) = inline_threads(review_comments) {
        issues.push(threads);
    }

    match policy.mode {
        ReviewMode::Judge => {
            let latest_bot = comments
                .iter()
                .rev()
                .find(|c| policy.matcher.is_bot(c.author_login()));
            if let Some(comment) = latest_bot {
                let blockers = policy.matcher.find_blockers(comment.body.as_deref().unwrap_or(""));
                if !blockers.is_empty() {
                    issues.push(format!("@{} flagged {}", comment.author_login(), blockers.join(" | ")));
                }
            }
            let verdict = if issues.is_empty() {
                Verdict::pass()
            } else {
                Verdict::fail(issues.join("; "))
            };
            ReviewOutcome {
                verdict,
                comments_for_review: Vec::new(),
            }
        }
        ReviewMode::Defer => {
            let excerpts = recent_excerpts(policy, reviews, comments);
            let verdict = if !issues.is_empty() {
                Verdict::fail(issues.join("; "))
            } else if !excerpts.is_empty() {
                Verdict::new(Status::NeedsReview, "Has comments \u{2014} pending review")
            } else {
                Verdict::pass()
            };
            ReviewOutcome {
                verdict,
                comments_for_review: excerpts,
            }
        }
    }
}

/// Reviewers whose latest decisive state is CHANGES_REQUESTED, in first-seen order.
/// A later APPROVED or DISMISSED from the same reviewer resolves it; COMMENTED does not.
fn unresolved_reviewers(reviews: &[Review]) -> Vec<&str> {
    let mut states: Vec<(&str, &str)> = Vec::new();
    for review in reviews {
        let login = review.reviewer();
        let state = review.state.as_str();
        let seen = states.iter().position(|(user, _)| *user == login);
        match (state, seen) {
            ("CHANGES_REQUESTED", Some(i)) => states[i].1 = state,
            ("CHANGES_REQUESTED", None) => states.push((login, state)),
            ("APPROVED" | "DISMISSED", Some(i)) if states[i].1 == "CHANGES_REQUESTED" => {
                states[i].1 = state
            }
            _ => {}
        }
    }
    states
        .into_iter()
        .filter(|(_, state)| *state == "CHANGES_REQUESTED")
        .map(|(user, _)| user)
        .collect()
}

/// "3 inline threads on a.rs, b.rs"
fn inline_threads(review_comments: &[InlineComment]) -> Option<String> {
    if review_comments.is_empty() {
        return None;
    }
    let paths: BTreeSet<&str> = review_comments
        .iter()
        .filter_map(|c| c.path.as_deref())
        .filter(|p| !p.is_empty())
        .collect();
    let count = review_comments.len();
    if paths.is_empty() {
        return Some(format!("{} inline threads", count));
    }
    let listed: Vec<&str> = paths.into_iter().take(MAX_LISTED_PATHS).collect();
    Some(format!("{} inline threads on {}", count, listed.join(", ")))
}

fn recent_excerpts(
    policy: &ReviewPolicy,
    reviews: &[Review],
    comments: &[PrComment],
) -> Vec<CommentExcerpt> {
    let tail = |len: usize| len.saturating_sub(policy.recent_count);
    let mut excerpts = Vec::new();

    for comment in &comments[tail(comments.len())..] {
        let body = truncate_chars(comment.body.as_deref().unwrap_or(""), policy.comment_excerpt_chars);
        if !body.trim().is_empty() {
            excerpts.push(CommentExcerpt {
                author: comment.author_login().to_string(),
                state: None,
                body: body.to_string(),
            });
        }
    }

    for review in &reviews[tail(reviews.len())..] {
        let body = truncate_chars(review.body.as_deref().unwrap_or(""), policy.review_excerpt_chars);
        if !body.trim().is_empty() {
            excerpts.push(CommentExcerpt {
                author: review.reviewer().to_string(),
                state: Some(review.state.clone()),
                body: body.to_string(),
            });
        }
    }

    excerpts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::types::tests::{comment, review};

    const BOT_COMMENT: &str = "## Review Summary\nLooks mostly fine.\n\n\
### Blocker Issues\n- **Race condition** in `cache.rs` when two workers refresh the token concurrently.\n\n\
### Critical Issues\n**None**\n\n\
### Suggestions\n- Hardcoded password in test fixture.\n";

    fn policy(mode: ReviewMode) -> ReviewPolicy {
        let config = ReviewConfig {
            mode,
            ..ReviewConfig::default()
        };
        ReviewPolicy::from_config(&config).unwrap()
    }

    fn inline(path: &str) -> InlineComment {
        InlineComment {
            path: Some(path.to_string()),
            line: Some(1),
            body: Some("nit".to_string()),
        }
    }

    #[test]
    fn test_no_activity_passes() {
        let outcome = check_reviews(&policy(ReviewMode::Judge), &[], &[], &[]);
        assert_eq!(outcome.verdict, Verdict::pass());
        assert!(outcome.comments_for_review.is_empty());
    }

    #[test]
    fn test_changes_requested_then_approved_is_resolved() {
        let reviews = vec![review("bob", "CHANGES_REQUESTED"), review("bob", "APPROVED")];
        let outcome = check_reviews(&policy(ReviewMode::Judge), &reviews, &[], &[]);
        assert_eq!(outcome.verdict.status, Status::Pass);
    }

    #[test]
    fn test_approved_then_changes_requested_is_reported() {
        let reviews = vec![review("bob", "APPROVED"), review("bob", "CHANGES_REQUESTED")];
        let outcome = check_reviews(&policy(ReviewMode::Judge), &reviews, &[], &[]);
        assert_eq!(outcome.verdict, Verdict::fail("CHANGES_REQUESTED from @bob"));
    }

    #[test]
    fn test_dismissed_resolves_but_commented_does_not() {
        let reviews = vec![
            review("bob", "CHANGES_REQUESTED"),
            review("carol", "CHANGES_REQUESTED"),
            review("bob", "DISMISSED"),
            review("carol", "COMMENTED"),
        ];
        assert_eq!(unresolved_reviewers(&reviews), vec!["carol"]);
    }

    #[test]
    fn test_other_reviewer_approval_does_not_resolve() {
        let reviews = vec![review("bob", "CHANGES_REQUESTED"), review("carol", "APPROVED")];
        assert_eq!(unresolved_reviewers(&reviews), vec!["bob"]);
    }

    #[test]
    fn test_inline_threads_fail_with_paths() {
        let threads = vec![inline("src/b.rs"), inline("src/a.rs"), inline("src/c.rs"), inline("src/a.rs")];
        let outcome = check_reviews(&policy(ReviewMode::Judge), &[], &threads, &[]);
        assert_eq!(outcome.verdict, Verdict::fail("4 inline threads on src/a.rs, src/b.rs"));
    }

    #[test]
    fn test_judge_fails_on_bot_blocker_section() {
        let comments = vec![comment("review-bot", BOT_COMMENT)];
        let outcome = check_reviews(&policy(ReviewMode::Judge), &[], &[], &comments);
        assert_eq!(outcome.verdict.status, Status::Fail);
        assert!(outcome.verdict.detail.starts_with("@review-bot flagged Blocker Issues: - Race condition"));
        // Critical Issues is "None" and Suggestions is not a blocker section
        assert!(!outcome.verdict.detail.contains("Critical Issues"));
        assert!(!outcome.verdict.detail.contains("password"));
    }

    #[test]
    fn test_judge_ignores_human_comments() {
        let comments = vec![comment("alice", BOT_COMMENT)];
        let outcome = check_reviews(&policy(ReviewMode::Judge), &[], &[], &comments);
        assert_eq!(outcome.verdict.status, Status::Pass);
    }

    #[test]
    fn test_judge_uses_only_latest_bot_comment() {
        let comments = vec![
            comment("review-bot", BOT_COMMENT),
            comment("review-bot", "### Blocker Issues\nNone.\n"),
            comment("alice", "thanks!"),
        ];
        let outcome = check_reviews(&policy(ReviewMode::Judge), &[], &[], &comments);
        assert_eq!(outcome.verdict.status, Status::Pass);
    }

    #[test]
    fn test_section_without_severity_keyword_is_not_blocker() {
        let matcher = policy(ReviewMode::Judge).matcher;
        let body = "### Blocker Issues\n- Variable naming could be clearer.\n";
        assert!(matcher.find_blockers(body).is_empty());
    }

    #[test]
    fn test_blocker_excerpt_is_truncated() {
        let config = ReviewConfig {
            excerpt_chars: 20,
            ..ReviewConfig::default()
        };
        let matcher = BlockerMatcher::from_config(&config).unwrap();
        let body = "### Critical Issues\nSQL injection in the report query builder via user-supplied filters\n";
        let blockers = matcher.find_blockers(body);
        assert_eq!(blockers, vec!["Critical Issues: SQL injection in the...".to_string()]);
    }

    #[test]
    fn test_sections_split_on_headings() {
        let matcher = policy(ReviewMode::Judge).matcher;
        let sections = matcher.sections(BOT_COMMENT);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].0, "Blocker Issues");
        assert!(sections[0].1.contains("cache.rs"));
        assert!(!sections[0].1.contains("Critical"));
        assert_eq!(sections[1].0, "Critical Issues");
        assert_eq!(sections[1].1.trim(), "**None**");
    }

    #[test]
    fn test_judge_fails_on_finding_under_subheading() {
        let body = "## Review\n### Blocker Issues\n#### 1. SQL injection in query builder\n\
User input reaches the raw query.\n#### 2. Naming\nMinor.\n### Suggestions\nNone.\n";
        let comments = vec![comment("review-bot", body)];
        let outcome = check_reviews(&policy(ReviewMode::Judge), &[], &[], &comments);
        assert_eq!(outcome.verdict.status, Status::Fail);
        assert!(outcome.verdict.detail.contains("Blocker Issues"));
        assert!(outcome.verdict.detail.contains("SQL injection"));
    }

    #[test]
    fn test_section_ends_at_same_or_higher_heading() {
        let matcher = policy(ReviewMode::Judge).matcher;
        let body = "### Blocker Issues\n#### Detail\nrace condition\n## Next\nhardcoded password\n";
        let sections = matcher.sections(body);
        assert_eq!(sections.len(), 1);
        assert!(sections[0].1.contains("#### Detail"));
        assert!(sections[0].1.contains("race condition"));
        assert!(!sections[0].1.contains("password"));
    }

    #[test]
    fn test_custom_keywords_and_sections() {
        let config = ReviewConfig {
            blocker_sections: vec!["Must Fix".to_string()],
            severity_keywords: vec![r"license\s+violation".to_string()],
            ..ReviewConfig::default()
        };
        let matcher = BlockerMatcher::from_config(&config).unwrap();
        assert_eq!(
            matcher.find_blockers("# Must Fix\nGPL license violation in vendored code\n").len(),
            1
        );
        assert!(matcher.find_blockers("### Blocker Issues\nrace condition\n").is_empty());
    }

    #[test]
    fn test_invalid_keyword_is_config_error() {
        let config = ReviewConfig {
            severity_keywords: vec!["(unclosed".to_string()],
            ..ReviewConfig::default()
        };
        assert!(matches!(
            BlockerMatcher::from_config(&config),
            Err(ConfigError::InvalidPattern { field: "review.severity_keywords", .. })
        ));
    }

    #[test]
    fn test_bot_detection() {
        let matcher = policy(ReviewMode::Judge).matcher;
        assert!(matcher.is_bot("github-actions[bot]"));
        assert!(matcher.is_bot("Review-Bot"));
        assert!(!matcher.is_bot("abbott"));
        assert!(!matcher.is_bot(""));
    }

    #[test]
    fn test_defer_returns_needs_review_with_excerpts() {
        let mut approved = review("bob", "APPROVED");
        approved.body = Some("LGTM".to_string());
        let comments = vec![
            comment("a", "one"),
            comment("b", "two"),
            comment("c", "   "),
            comment("d", BOT_COMMENT),
        ];
        let outcome = check_reviews(&policy(ReviewMode::Defer), &[approved], &[], &comments);
        assert_eq!(outcome.verdict.status, Status::NeedsReview);
        // Only the last three comments are considered; the blank one is dropped
        let authors: Vec<&str> = outcome.comments_for_review.iter().map(|e| e.author.as_str()).collect();
        assert_eq!(authors, vec!["b", "d", "bob"]);
        assert_eq!(outcome.comments_for_review[2].state.as_deref(), Some("APPROVED"));
    }

    #[test]
    fn test_defer_truncates_comment_bodies() {
        let long = "x".repeat(800);
        let comments = vec![comment("a", &long)];
        let outcome = check_reviews(&policy(ReviewMode::Defer), &[], &[], &comments);
        assert_eq!(outcome.comments_for_review[0].body.len(), 500);
    }

    #[test]
    fn test_defer_still_fails_on_changes_requested() {
        let reviews = vec![review("bob", "CHANGES_REQUESTED")];
        let comments = vec![comment("a", "please fix")];
        let outcome = check_reviews(&policy(ReviewMode::Defer), &reviews, &[], &comments);
        assert_eq!(outcome.verdict.status, Status::Fail);
        assert_eq!(outcome.comments_for_review.len(), 1);
    }

    #[test]
    fn test_defer_does_not_judge_bot_content() {
        let comments = vec![comment("review-bot", BOT_COMMENT)];
        let outcome = check_reviews(&policy(ReviewMode::Defer), &[], &[], &comments);
        assert_eq!(outcome.verdict.status, Status::NeedsReview);
    }
}
