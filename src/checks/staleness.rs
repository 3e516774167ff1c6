use chrono::{DateTime, Utc};

use crate::report::types::Verdict;
use crate::util::{days_between, parse_timestamp};

/// Staleness verdict plus the day count kept for close recommendations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staleness {
    pub verdict: Verdict,
    pub days_old: Option<i64>,
}

/// Fail PRs not updated for more than `max_age_days`, or whose timestamp is
/// missing or unparsable.
pub fn check_staleness(updated_at: &str, now: DateTime<Utc>, max_age_days: i64) -> Staleness {
    if updated_at.trim().is_empty() {
        return Staleness {
            verdict: Verdict::fail("No updatedAt date found"),
            days_old: None,
        };
    }
    let Some(updated) = parse_timestamp(updated_at) else {
        return Staleness {
            verdict: Verdict::fail("Cannot parse date"),
            days_old: None,
        };
    };

    let days_old = days_between(now, updated);
    let verdict = if days_old > max_age_days {
        Verdict::fail(format!(
            "Last updated {} \u{2014} {} days ago",
            updated.date_naive(),
            days_old
        ))
    } else {
        Verdict::pass()
    };
    Staleness {
        verdict,
        days_old: Some(days_old),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::report::types::Status;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_recent_update_passes() {
        let result = check_staleness("2024-06-25T12:00:00Z", now(), 30);
        assert_eq!(result.verdict, Verdict::pass());
        assert_eq!(result.days_old, Some(5));
    }

    #[test]
    fn test_exactly_threshold_passes() {
        let result = check_staleness("2024-05-31T12:00:00Z", now(), 30);
        assert_eq!(result.days_old, Some(30));
        assert_eq!(result.verdict.status, Status::Pass);
    }

    #[test]
    fn test_old_update_fails_with_day_count() {
        let result = check_staleness("2024-05-01T12:00:00Z", now(), 30);
        assert_eq!(result.days_old, Some(60));
        assert_eq!(result.verdict.status, Status::Fail);
        assert_eq!(result.verdict.detail, "Last updated 2024-05-01 \u{2014} 60 days ago");
    }

    #[test]
    fn test_missing_timestamp_fails() {
        let result = check_staleness("", now(), 30);
        assert_eq!(result.verdict, Verdict::fail("No updatedAt date found"));
        assert_eq!(result.days_old, None);
    }

    #[test]
    fn test_unparsable_timestamp_fails() {
        let result = check_staleness("last tuesday", now(), 30);
        assert_eq!(result.verdict, Verdict::fail("Cannot parse date"));
        assert_eq!(result.days_old, None);
    }
}
