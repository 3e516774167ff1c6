use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::config::{ConfigError, TicketConfig};
use crate::report::types::Verdict;

static TICKET_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]{2,})-\d+").expect("Invalid ticket regex"));

/// Recognizes issue-tracker references such as `RHOAIENG-1234`.
#[derive(Debug, Clone)]
pub struct TicketMatcher {
    project: Regex,
    excluded: HashSet<String>,
}

impl TicketMatcher {
    pub fn from_config(config: &TicketConfig) -> Result<Self, ConfigError> {
        let pattern = format!(r"{}-\d+", regex::escape(&config.project_key));
        let project = Regex::new(&pattern).map_err(|source| ConfigError::InvalidPattern {
            field: "tickets.project_key",
            pattern,
            source,
        })?;
        Ok(Self {
            project,
            excluded: config.excluded_prefixes.iter().cloned().collect(),
        })
    }

    /// True if `text` contains a project reference or any non-excluded `ABC-123` token.
    pub fn has_reference(&self, text: &str) -> bool {
        if self.project.is_match(text) {
            return true;
        }
        TICKET_TOKEN
            .captures_iter(text)
            .any(|caps| !self.excluded.contains(&caps[1]))
    }
}

/// Advisory only: a missing reference is a warning, never a failure.
pub fn check_ticket(matcher: &TicketMatcher, title: &str, body: &str, branch: &str) -> Verdict {
    let text = format!("{} {} {}", title, body, branch);
    if matcher.has_reference(&text) {
        Verdict::pass()
    } else {
        Verdict::warn("No Jira reference found")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::types::Status;

    fn matcher() -> TicketMatcher {
        TicketMatcher::from_config(&TicketConfig::default()).unwrap()
    }

    #[test]
    fn test_project_reference_in_branch() {
        let verdict = check_ticket(&matcher(), "Fix login", "", "fix/RHOAIENG-4821-login");
        assert_eq!(verdict, Verdict::pass());
    }

    #[test]
    fn test_other_project_reference_passes() {
        assert_eq!(check_ticket(&matcher(), "OPS-12: rotate keys", "", "").status, Status::Pass);
    }

    #[test]
    fn test_excluded_prefixes_do_not_count() {
        let verdict = check_ticket(&matcher(), "Patch CVE-2024-1234", "See HTTP-2 notes", "wip");
        assert_eq!(verdict, Verdict::warn("No Jira reference found"));
    }

    #[test]
    fn test_excluded_then_real_reference() {
        assert_eq!(
            check_ticket(&matcher(), "Patch CVE-2024 for DATA-9", "", "").status,
            Status::Pass
        );
    }

    #[test]
    fn test_no_reference_warns() {
        assert_eq!(check_ticket(&matcher(), "Fix typo", "", "fix-typo").status, Status::Warn);
    }

    #[test]
    fn test_custom_project_key_is_escaped() {
        let config = TicketConfig {
            project_key: "A.B".to_string(),
            excluded_prefixes: vec![],
        };
        let matcher = TicketMatcher::from_config(&config).unwrap();
        assert!(matcher.has_reference("see A.B-7"));
        assert!(!matcher.has_reference("see AxB-7"));
    }
}
