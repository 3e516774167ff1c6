use serde::Deserialize;

use super::diff::{self, LineRange};

// ---------------------------------------------------------------------------
// Raw input records, as written by the fetch step
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Login {
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelRecord {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MilestoneRecord {
    #[serde(default)]
    pub title: String,
}

/// One entry of index.json. Only `number` is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub number: u64,
    pub title: Option<String>,
    pub url: Option<String>,
    pub author: Option<Login>,
    pub is_draft: Option<bool>,
    pub mergeable: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub head_ref_name: Option<String>,
    pub body: Option<String>,
    pub additions: Option<u64>,
    pub deletions: Option<u64>,
    pub changed_files: Option<u64>,
    pub labels: Option<Vec<LabelRecord>>,
}

/// The `pr` object of a detail record: index fields plus nested facts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailPr {
    pub title: Option<String>,
    pub url: Option<String>,
    pub author: Option<Login>,
    pub is_draft: Option<bool>,
    pub mergeable: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub head_ref_name: Option<String>,
    pub body: Option<String>,
    pub additions: Option<u64>,
    pub deletions: Option<u64>,
    pub changed_files: Option<u64>,
    pub labels: Option<Vec<LabelRecord>>,
    pub milestone: Option<MilestoneRecord>,
    #[serde(default)]
    pub comments: Vec<PrComment>,
    #[serde(default)]
    pub status_check_rollup: Vec<StatusRollupEntry>,
}

/// Contents of prs/{number}.json.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailRecord {
    #[serde(default)]
    pub pr: DetailPr,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub review_comments: Vec<InlineComment>,
    #[serde(default)]
    pub check_runs: Vec<CheckRun>,
    #[serde(default)]
    pub diff_files: Vec<DiffFileRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Review {
    /// REST reviews carry `user`, `gh pr view` carries `author`
    #[serde(default, alias = "author")]
    pub user: Option<Login>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub body: Option<String>,
}

impl Review {
    pub fn reviewer(&self) -> &str {
        self.user.as_ref().map(|u| u.login.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InlineComment {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub line: Option<u64>,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrComment {
    #[serde(default)]
    pub author: Option<Login>,
    #[serde(default)]
    pub body: Option<String>,
}

impl PrComment {
    /// Login of the comment author; empty for deleted accounts
    pub fn author_login(&self) -> &str {
        self.author.as_ref().map(|a| a.login.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckRun {
    #[serde(default)]
    pub name: Option<String>,
    /// queued, in_progress, completed
    #[serde(default)]
    pub status: Option<String>,
    /// success, failure, neutral, cancelled, timed_out, action_required, skipped
    #[serde(default)]
    pub conclusion: Option<String>,
}

/// Legacy status rollup entry (upper-case convention), used only without check runs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusRollupEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiffFileRecord {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub patch: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved facts
// ---------------------------------------------------------------------------

/// Mergeability as reported by GitHub. Unrecognized values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mergeable {
    Mergeable,
    Conflicting,
    Other(String),
}

impl Mergeable {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "MERGEABLE" => Mergeable::Mergeable,
            "CONFLICTING" => Mergeable::Conflicting,
            other => Mergeable::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for Mergeable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mergeable::Mergeable => write!(f, "MERGEABLE"),
            Mergeable::Conflicting => write!(f, "CONFLICTING"),
            Mergeable::Other(raw) if raw.is_empty() => write!(f, "unknown"),
            Mergeable::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// A changed file with its post-change hunk ranges.
#[derive(Debug, Clone)]
pub struct DiffFile {
    /// File path (e.g., "src/auth/config.rs")
    pub path: String,
    /// Post-change line ranges, one per non-empty hunk
    pub hunks: Vec<LineRange>,
    /// Valid hunk headers in the patch, pure deletions included
    pub hunk_count: usize,
}

impl DiffFile {
    pub fn from_patch(path: impl Into<String>, patch: &str) -> Self {
        let headers = diff::hunk_headers(patch);
        Self {
            path: path.into(),
            hunks: diff::ranges(&headers),
            hunk_count: headers.len(),
        }
    }

    /// Whether the patch had any hunk, even one that only deletes lines.
    pub fn is_touched(&self) -> bool {
        self.hunk_count > 0
    }
}

/// All facts known about one pull request after joining index and detail.
#[derive(Debug, Clone)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub url: String,
    /// Author's GitHub login
    pub author: String,
    pub branch: String,
    pub body: String,
    pub is_draft: bool,
    pub mergeable: Mergeable,
    /// Raw ISO-8601 timestamps; parsed where needed
    pub created_at: String,
    pub updated_at: String,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
    pub labels: Vec<String>,
    pub milestone: String,
    pub reviews: Vec<Review>,
    pub review_comments: Vec<InlineComment>,
    pub comments: Vec<PrComment>,
    pub check_runs: Vec<CheckRun>,
    pub status_rollup: Vec<StatusRollupEntry>,
    pub files: Vec<DiffFile>,
}

impl PullRequest {
    /// `additions + deletions + changed_files * 10`, saturating
    pub fn size_score(&self) -> u64 {
        self.additions
            .saturating_add(self.deletions)
            .saturating_add(self.changed_files.saturating_mul(10))
    }
}
