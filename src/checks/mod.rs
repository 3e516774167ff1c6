pub mod ci;
pub mod conflict;
pub mod review;
pub mod staleness;
pub mod ticket;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::{Config, ConfigError};
use crate::pr::PullRequest;
use crate::report::types::{CommentExcerpt, Verdict};

use review::ReviewPolicy;
use ticket::TicketMatcher;

/// Verdicts of every blocker check for one PR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checks {
    pub ci: Verdict,
    pub conflict: Verdict,
    pub review: Verdict,
    pub comments_for_review: Vec<CommentExcerpt>,
    pub ticket: Verdict,
    pub stale: Verdict,
    pub days_since_update: Option<i64>,
}

impl Checks {
    /// Number of FAIL verdicts among CI, conflict, review and staleness.
    /// The ticket check is advisory and never counts.
    pub fn fail_count(&self) -> usize {
        [&self.ci, &self.conflict, &self.review, &self.stale]
            .iter()
            .filter(|v| v.is_fail())
            .count()
    }
}

/// Runs the blocker checklist. Holds the compiled patterns so they are built
/// once per run rather than once per PR.
#[derive(Debug, Clone)]
pub struct Checker {
    review: ReviewPolicy,
    tickets: TicketMatcher,
    max_age_days: i64,
}

impl Checker {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            review: ReviewPolicy::from_config(&config.review)?,
            tickets: TicketMatcher::from_config(&config.tickets)?,
            max_age_days: config.staleness.max_age_days,
        })
    }

    /// Evaluate one PR. Never fails: every problem becomes a verdict.
    pub fn run_all(&self, pr: &PullRequest, now: DateTime<Utc>) -> Checks {
        let ci = ci::check_ci(&pr.check_runs, &pr.status_rollup);
        let conflict = conflict::check_conflicts(&pr.mergeable);
        let review = review::check_reviews(&self.review, &pr.reviews, &pr.review_comments, &pr.comments);
        let ticket = ticket::check_ticket(&self.tickets, &pr.title, &pr.body, &pr.branch);
        let stale = staleness::check_staleness(&pr.updated_at, now, self.max_age_days);

        let checks = Checks {
            ci,
            conflict,
            review: review.verdict,
            comments_for_review: review.comments_for_review,
            ticket,
            stale: stale.verdict,
            days_since_update: stale.days_old,
        };
        debug!(
            pr = pr.number,
            ci = %checks.ci.status,
            conflict = %checks.conflict.status,
            review = %checks.review.status,
            ticket = %checks.ticket.status,
            stale = %checks.stale.status,
            fail_count = checks.fail_count(),
            "checks complete"
        );
        checks
    }
}
