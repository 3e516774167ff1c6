pub mod diff;
pub mod types;

pub use types::{Mergeable, PullRequest};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use types::{DetailRecord, DiffFile, IndexEntry};

/// Detail files at or below this size are treated as absent (e.g. `{}` or `null`).
const MIN_DETAIL_BYTES: u64 = 10;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read index {path}: {source}")]
    IndexRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse index {path}: {source}")]
    IndexParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Pick the detail value, else the index value, else the default.
pub fn resolve<T>(detail: Option<T>, index: Option<T>, default: T) -> T {
    detail.or(index).unwrap_or(default)
}

/// `resolve` for text fields: empty strings count as absent.
fn resolve_text(detail: &Option<String>, index: &Option<String>) -> String {
    let present = |value: &Option<String>| value.clone().filter(|s| !s.is_empty());
    resolve(present(detail), present(index), String::new())
}

/// Join one index entry with its (optional) detail record.
pub fn resolve_pull_request(index: &IndexEntry, detail: Option<&DetailRecord>) -> PullRequest {
    let empty = DetailRecord::default();
    let detail = detail.unwrap_or(&empty);
    let pr = &detail.pr;

    let author = resolve(
        pr.author.as_ref().map(|a| a.login.clone()).filter(|l| !l.is_empty()),
        index.author.as_ref().map(|a| a.login.clone()).filter(|l| !l.is_empty()),
        "unknown".to_string(),
    );
    let mergeable = resolve(
        pr.mergeable.clone().filter(|m| !m.is_empty()),
        index.mergeable.clone().filter(|m| !m.is_empty()),
        "UNKNOWN".to_string(),
    );
    let labels = resolve(pr.labels.clone(), index.labels.clone(), Vec::new())
        .into_iter()
        .map(|l| l.name)
        .collect();

    let files = detail
        .diff_files
        .iter()
        .filter(|f| !f.filename.is_empty())
        .map(|f| DiffFile::from_patch(f.filename.as_str(), f.patch.as_deref().unwrap_or("")))
        .collect();

    PullRequest {
        number: index.number,
        title: resolve_text(&pr.title, &index.title),
        url: resolve_text(&pr.url, &index.url),
        author,
        branch: resolve_text(&pr.head_ref_name, &index.head_ref_name),
        body: resolve_text(&pr.body, &index.body),
        is_draft: resolve(pr.is_draft, index.is_draft, false),
        mergeable: Mergeable::parse(&mergeable),
        created_at: resolve_text(&pr.created_at, &index.created_at),
        updated_at: resolve_text(&pr.updated_at, &index.updated_at),
        additions: resolve(pr.additions, index.additions, 0),
        deletions: resolve(pr.deletions, index.deletions, 0),
        changed_files: resolve(pr.changed_files, index.changed_files, 0),
        labels,
        milestone: pr.milestone.as_ref().map(|m| m.title.clone()).unwrap_or_default(),
        reviews: detail.reviews.clone(),
        review_comments: detail.review_comments.clone(),
        comments: pr.comments.clone(),
        check_runs: detail.check_runs.clone(),
        status_rollup: pr.status_check_rollup.clone(),
        files,
    }
}

/// Parse the contents of index.json.
pub fn parse_index(path: &Path, contents: &str) -> Result<Vec<IndexEntry>, LoadError> {
    serde_json::from_str(contents).map_err(|source| LoadError::IndexParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load `{dir}/index.json` and every available `{dir}/prs/{number}.json`,
/// returning resolved pull requests in index order.
///
/// The index is mandatory. Detail files that are missing, too small, or
/// unparsable are skipped and the PR falls back to index-only facts.
#[instrument(skip(dir), fields(dir = %dir.display()))]
pub async fn load_pull_requests(dir: &Path) -> Result<Vec<PullRequest>, LoadError> {
    let index_path = dir.join("index.json");
    let contents = tokio::fs::read_to_string(&index_path)
        .await
        .map_err(|source| LoadError::IndexRead {
            path: index_path.clone(),
            source,
        })?;
    let index = parse_index(&index_path, &contents)?;
    debug!(entries = index.len(), "loaded index");

    let mut details = HashMap::new();
    for entry in &index {
        if let Some(detail) = load_detail(dir, entry.number).await {
            details.insert(entry.number, detail);
        }
    }
    debug!(details = details.len(), "loaded detail records");

    Ok(index
        .iter()
        .map(|entry| resolve_pull_request(entry, details.get(&entry.number)))
        .collect())
}

async fn load_detail(dir: &Path, number: u64) -> Option<DetailRecord> {
    let path = dir.join("prs").join(format!("{}.json", number));
    let metadata = tokio::fs::metadata(&path).await.ok()?;
    if metadata.len() <= MIN_DETAIL_BYTES {
        debug!(pr = number, "detail record empty, using index only");
        return None;
    }
    let contents = match tokio::fs::read_to_string(&path).await {
        Ok(contents) => contents,
        Err(err) => {
            warn!(pr = number, error = %err, "failed to read detail record");
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(detail) => Some(detail),
        Err(err) => {
            warn!(pr = number, error = %err, "failed to parse detail record, using index only");
            None
        }
    }
}
