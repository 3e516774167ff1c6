use serde::{Serialize, Serializer};

use crate::analysis::overlap::{OverlapEdge, SharedFiles};

/// Placeholder detail for verdicts with nothing to say.
pub const NO_DETAIL: &str = "\u{2014}";

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    #[serde(rename = "pass")]
    Pass,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "FAIL")]
    Fail,
    /// Comments need a human (or agent) to judge them
    #[serde(rename = "needs_review")]
    NeedsReview,
    /// The check does not apply to this PR
    #[serde(rename = "\u{2014}")]
    NotApplicable,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Pass => write!(f, "pass"),
            Status::Warn => write!(f, "warn"),
            Status::Fail => write!(f, "FAIL"),
            Status::NeedsReview => write!(f, "needs_review"),
            Status::NotApplicable => write!(f, "{}", NO_DETAIL),
        }
    }
}

/// A check status plus a human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub status: Status,
    pub detail: String,
}

impl Verdict {
    pub fn pass() -> Self {
        Self::new(Status::Pass, NO_DETAIL)
    }

    pub fn warn(detail: impl Into<String>) -> Self {
        Self::new(Status::Warn, detail)
    }

    pub fn fail(detail: impl Into<String>) -> Self {
        Self::new(Status::Fail, detail)
    }

    pub fn not_applicable() -> Self {
        Self::new(Status::NotApplicable, NO_DETAIL)
    }

    pub fn new(status: Status, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn is_fail(&self) -> bool {
        self.status == Status::Fail
    }
}

/// A trimmed comment or review handed to a downstream reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentExcerpt {
    pub author: String,
    /// Review state; absent for plain PR comments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub body: String,
}

/// Merge-readiness result for one PR.
///
/// Serialized flat: each verdict becomes a `<check>_status` / `<check>_detail`
/// pair and the ticket check is keyed `jira`.
#[derive(Debug, Clone)]
pub struct PrResult {
    pub number: u64,
    /// 1-based position after ranking
    pub rank: usize,
    pub title: String,
    pub url: String,
    pub author: String,
    pub is_draft: bool,
    /// e.g. "3 files (+120/-4)"
    pub size: String,
    pub size_score: u64,
    pub updated_at: String,
    pub created_at: String,
    pub branch: String,
    pub labels: Vec<String>,
    pub milestone: String,
    pub ci: Verdict,
    pub conflict: Verdict,
    pub review: Verdict,
    pub comments_for_review: Vec<CommentExcerpt>,
    pub ticket: Verdict,
    pub stale: Verdict,
    pub days_since_update: Option<i64>,
    pub overlap: Verdict,
    pub notes: String,
    pub fail_count: usize,
    pub has_priority: bool,
    pub superseded_by: Option<u64>,
    pub recommend_close: bool,
    pub recommend_close_reason: String,
}

/// Wire shape of `PrResult` in analysis.json.
#[derive(Serialize)]
struct PrRecord<'a> {
    number: u64,
    rank: usize,
    title: &'a str,
    url: &'a str,
    author: &'a str,
    #[serde(rename = "isDraft")]
    is_draft: bool,
    size: &'a str,
    size_score: u64,
    #[serde(rename = "updatedAt")]
    updated_at: &'a str,
    #[serde(rename = "createdAt")]
    created_at: &'a str,
    branch: &'a str,
    labels: &'a [String],
    #[serde(rename = "milestoneCurrently")]
    milestone: &'a str,
    ci_status: Status,
    ci_detail: &'a str,
    conflict_status: Status,
    conflict_detail: &'a str,
    review_status: Status,
    review_detail: &'a str,
    comments_for_review: &'a [CommentExcerpt],
    jira_status: Status,
    jira_detail: &'a str,
    stale_status: Status,
    stale_detail: &'a str,
    days_since_update: Option<i64>,
    overlap_status: Status,
    overlap_detail: &'a str,
    notes: &'a str,
    fail_count: usize,
    has_priority: bool,
    superseded_by: Option<u64>,
    recommend_close: bool,
    recommend_close_reason: &'a str,
}

impl<'a> From<&'a PrResult> for PrRecord<'a> {
    fn from(r: &'a PrResult) -> Self {
        Self {
            number: r.number,
            rank: r.rank,
            title: &r.title,
            url: &r.url,
            author: &r.author,
            is_draft: r.is_draft,
            size: &r.size,
            size_score: r.size_score,
            updated_at: &r.updated_at,
            created_at: &r.created_at,
            branch: &r.branch,
            labels: &r.labels,
            milestone: &r.milestone,
            ci_status: r.ci.status,
            ci_detail: &r.ci.detail,
            conflict_status: r.conflict.status,
            conflict_detail: &r.conflict.detail,
            review_status: r.review.status,
            review_detail: &r.review.detail,
            comments_for_review: &r.comments_for_review,
            jira_status: r.ticket.status,
            jira_detail: &r.ticket.detail,
            stale_status: r.stale.status,
            stale_detail: &r.stale.detail,
            days_since_update: r.days_since_update,
            overlap_status: r.overlap.status,
            overlap_detail: &r.overlap.detail,
            notes: &r.notes,
            fail_count: r.fail_count,
            has_priority: r.has_priority,
            superseded_by: r.superseded_by,
            recommend_close: r.recommend_close,
            recommend_close_reason: &r.recommend_close_reason,
        }
    }
}

impl Serialize for PrResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PrRecord::from(self).serialize(serializer)
    }
}

/// Aggregate counts over the ranked list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub drafts: usize,
    /// Non-draft PRs with no blockers
    pub clean: usize,
    pub one_blocker: usize,
    pub needs_work: usize,
    pub recommend_close: usize,
}

/// Complete merge-readiness report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: String,
    pub stats: Stats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_order: Option<Vec<u64>>,
    pub prs: Vec<PrResult>,
    pub overlaps: Vec<OverlapEdge>,
    pub shared_no_overlap: Vec<SharedFiles>,
}
