use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiffError {
    #[error("Invalid hunk header: {0}")]
    InvalidHeader(String),

    #[error("Invalid range '{0}'")]
    InvalidRange(String),
}

/// Inclusive line range `[start, end]` in the post-change file.
/// Serialized as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(into = "[u64; 2]")]
pub struct LineRange {
    pub start: u64,
    pub end: u64,
}

impl LineRange {
    /// Range covering `count` lines from `start`; `None` for an empty hunk
    /// or one whose end does not fit in a `u64`.
    pub fn from_start_count(start: u64, count: u64) -> Option<Self> {
        let end = start.checked_add(count.checked_sub(1)?)?;
        Some(Self { start, end })
    }

    /// Boundary-inclusive intersection test.
    pub fn overlaps(&self, other: &LineRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl From<LineRange> for [u64; 2] {
    fn from(range: LineRange) -> Self {
        [range.start, range.end]
    }
}

/// `(new_start, new_count)` of every valid hunk header in a unified-diff patch.
///
/// Hunks look like: @@ -{old_start}[,{old_count}] +{new_start}[,{new_count}] @@
///
/// Only the `+` side is kept. An omitted count means one line. Headers that do
/// not parse are skipped with a debug log.
pub fn hunk_headers(patch: &str) -> Vec<(u64, u64)> {
    patch
        .lines()
        .filter(|line| line.starts_with("@@"))
        .filter_map(|line| match parse_hunk_header(line) {
            Ok(header) => Some(header),
            Err(err) => {
                debug!(error = %err, "skipping hunk header");
                None
            }
        })
        .collect()
}

/// Post-change line ranges of a patch. Zero-length (pure deletion) hunks and
/// hunks whose end overflows contribute no range.
pub fn parse_hunks(patch: &str) -> Vec<LineRange> {
    ranges(&hunk_headers(patch))
}

pub(crate) fn ranges(headers: &[(u64, u64)]) -> Vec<LineRange> {
    headers
        .iter()
        .filter_map(|&(start, count)| LineRange::from_start_count(start, count))
        .collect()
}

/// Parse `@@ -a,b +c,d @@ ...` into `(c, d)`.
fn parse_hunk_header(line: &str) -> Result<(u64, u64), DiffError> {
    let header = line
        .trim()
        .strip_prefix("@@")
        .ok_or_else(|| DiffError::InvalidHeader(line.to_string()))?;
    // Section context (e.g. a function signature) follows the closing @@
    let (ranges, _context) = header
        .split_once("@@")
        .ok_or_else(|| DiffError::InvalidHeader(line.to_string()))?;
    let mut parts = ranges.split_whitespace();
    let old_part = parts
        .next()
        .ok_or_else(|| DiffError::InvalidHeader(line.to_string()))?;
    let new_part = parts
        .next()
        .ok_or_else(|| DiffError::InvalidHeader(line.to_string()))?;
    if parts.next().is_some() {
        return Err(DiffError::InvalidHeader(line.to_string()));
    }

    parse_range(old_part, '-')?;
    parse_range(new_part, '+')
}

fn parse_range(part: &str, prefix: char) -> Result<(u64, u64), DiffError> {
    let range = part
        .strip_prefix(prefix)
        .ok_or_else(|| DiffError::InvalidRange(part.to_string()))?;
    let (start_str, count_str) = match range.split_once(',') {
        Some((start, count)) => (start, count),
        None => (range, "1"),
    };
    let start = start_str
        .parse::<u64>()
        .map_err(|_| DiffError::InvalidRange(part.to_string()))?;
    let count = count_str
        .parse::<u64>()
        .map_err(|_| DiffError::InvalidRange(part.to_string()))?;
    Ok((start, count))
}
