use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse a GitHub-style timestamp (`2024-05-01T12:00:00Z`).
///
/// Offsets other than `Z` are accepted and normalized to UTC. Timestamps
/// without an offset and bare dates are read as UTC. Returns `None` for
/// empty or unparsable input.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Whole days elapsed between `then` and `now`.
pub fn days_between(now: DateTime<Utc>, then: DateTime<Utc>) -> i64 {
    (now - then).num_days()
}

/// The `YYYY-MM-DD` prefix of a timestamp string, or the whole string if shorter.
pub fn date_prefix(raw: &str) -> &str {
    match raw.char_indices().nth(10) {
        Some((idx, _)) => &raw[..idx],
        None => raw,
    }
}

/// Remove markdown emphasis characters (`*`, `_`, `` ` ``, `~`).
pub fn strip_emphasis(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '*' | '_' | '`' | '~'))
        .collect()
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Collapse runs of whitespace and truncate, appending `...` when cut.
pub fn summarize(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let cut = truncate_chars(&collapsed, max_chars);
    if cut.len() < collapsed.len() {
        format!("{}...", cut.trim_end())
    } else {
        collapsed
    }
}
