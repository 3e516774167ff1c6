use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config file looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = ".pr-readiness.toml";

/// Environment variable that overrides `review.mode`.
pub const REVIEW_MODE_ENV: &str = "PR_READINESS_REVIEW_MODE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {field} pattern '{pattern}': {source}")]
    InvalidPattern {
        field: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid review mode '{0}' (expected 'judge' or 'defer')")]
    InvalidReviewMode(String),
}

/// Top-level configuration loaded from .pr-readiness.toml.
/// All tables are optional; the tool works with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub staleness: StalenessConfig,
    pub tickets: TicketConfig,
    pub review: ReviewConfig,
    pub ranking: RankingConfig,
    pub supersession: SupersessionConfig,
    pub close: CloseConfig,
    pub merge_order: MergeOrderConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StalenessConfig {
    /// PRs not updated for more than this many days fail the staleness check
    pub max_age_days: i64,
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self { max_age_days: 30 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TicketConfig {
    /// Project key whose `KEY-123` references always satisfy the check
    pub project_key: String,
    /// Upper-case prefixes that look like tickets but are not (e.g. CVE-2024)
    pub excluded_prefixes: Vec<String>,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            project_key: "RHOAIENG".to_string(),
            excluded_prefixes: ["CVE", "GHSA", "HTTP", "API", "URL", "PR", "WIP"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// How the review check treats PR comments beyond CHANGES_REQUESTED and inline threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReviewMode {
    /// Scan the latest bot comment for blocker sections and fail on high-severity findings
    #[default]
    Judge,
    /// Attach comment excerpts and return `needs_review` for a downstream reviewer
    Defer,
}

impl std::str::FromStr for ReviewMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "judge" => Ok(ReviewMode::Judge),
            "defer" => Ok(ReviewMode::Defer),
            other => Err(ConfigError::InvalidReviewMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub mode: ReviewMode,
    /// Substrings of a comment author's login that mark it as automation
    pub bot_markers: Vec<String>,
    /// Regex matching the start of a heading line (the section delimiter)
    pub section_heading: String,
    /// Section titles whose content is inspected for blockers
    pub blocker_sections: Vec<String>,
    /// Case-insensitive regexes for high-severity findings
    pub severity_keywords: Vec<String>,
    /// Section contents that mean "nothing to report" once emphasis is stripped
    pub none_markers: Vec<String>,
    /// Length of a blocker summary in the review detail
    pub excerpt_chars: usize,
    /// Length of a PR comment excerpt in defer mode
    pub comment_excerpt_chars: usize,
    /// Length of a review body excerpt in defer mode
    pub review_excerpt_chars: usize,
    /// How many trailing comments and reviews are excerpted in defer mode
    pub recent_count: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            mode: ReviewMode::default(),
            bot_markers: owned(&["[bot]", "-bot", "bot-"]),
            section_heading: r"^[ \t]*#{1,6}[ \t]+".to_string(),
            blocker_sections: owned(&["Blocker Issues", "Critical Issues"]),
            severity_keywords: owned(&[
                r"race\s+condition",
                r"hard-?coded\s+(?:credential|password|secret|token|api[\s_-]?key)s?",
                r"(?:sql|command|code|shell|ldap|template)\s+injection",
                r"(?:auth(?:entication|orization)?|rbac|permission)\s+(?:check\s+)?bypass",
                r"bypass(?:es|ing)?\s+(?:auth|rbac|permission)",
                r"(?:compil(?:e|ation)|build)\s+(?:fail(?:ure|s|ed)?|error)",
                r"(?:does\s+not|doesn't|won't|will\s+not)\s+compile",
                r"missing\s+required\s+(?:metadata|label|annotation|field)s?",
            ]),
            none_markers: owned(&["none", "n/a", "none found", "no issues", "no blockers"]),
            excerpt_chars: 200,
            comment_excerpt_chars: 500,
            review_excerpt_chars: 300,
            recent_count: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Labels that mark a PR as urgent
    pub priority_labels: Vec<String>,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            priority_labels: ["priority/critical", "bug", "hotfix", "priority/high"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SupersessionConfig {
    /// Titles must be longer than this to be compared
    pub min_title_len: usize,
}

impl Default for SupersessionConfig {
    fn default() -> Self {
        Self { min_title_len: 15 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CloseConfig {
    pub draft_inactive_days: i64,
    pub inactive_days: i64,
    pub stale_days: i64,
    pub stale_min_blockers: usize,
}

impl Default for CloseConfig {
    fn default() -> Self {
        Self {
            draft_inactive_days: 21,
            inactive_days: 60,
            stale_days: 30,
            stale_min_blockers: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MergeOrderConfig {
    pub enabled: bool,
}

impl Default for MergeOrderConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration from `path`, or from .pr-readiness.toml in the
    /// current directory when no path is given. A missing default file yields
    /// the default config. `PR_READINESS_REVIEW_MODE` overrides `review.mode`.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        if let Some(mode) = review_mode_override(std::env::var(REVIEW_MODE_ENV).ok().as_deref())? {
            config.review.mode = mode;
        }

        Ok(config)
    }

    /// Load from a specific path without environment overrides.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }
}

/// Parse a review-mode override; unset or blank means no override.
fn review_mode_override(raw: Option<&str>) -> Result<Option<ReviewMode>, ConfigError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(mode) => mode.parse().map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_review_mode_override_is_ignored() {
        assert_eq!(review_mode_override(None).unwrap(), None);
        assert_eq!(review_mode_override(Some("")).unwrap(), None);
        assert_eq!(review_mode_override(Some("  ")).unwrap(), None);
        assert_eq!(review_mode_override(Some("Defer")).unwrap(), Some(ReviewMode::Defer));
        assert!(matches!(
            review_mode_override(Some("maybe")),
            Err(ConfigError::InvalidReviewMode(_))
        ));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.staleness.max_age_days, 30);
        assert_eq!(config.tickets.project_key, "RHOAIENG");
        assert!(config.tickets.excluded_prefixes.contains(&"CVE".to_string()));
        assert_eq!(config.review.mode, ReviewMode::Judge);
        assert_eq!(config.review.blocker_sections.len(), 2);
        assert_eq!(config.supersession.min_title_len, 15);
        assert_eq!(config.close.inactive_days, 60);
        assert!(config.merge_order.enabled);
    }

    #[test]
    fn test_parse_partial_config_toml() {
        let toml_str = r#"
[staleness]
max_age_days = 14

[tickets]
project_key = "OPS"

[review]
mode = "defer"
recent_count = 5

[merge_order]
enabled = false
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.staleness.max_age_days, 14);
        assert_eq!(config.tickets.project_key, "OPS");
        // Unset fields in a present table keep their defaults
        assert!(!config.tickets.excluded_prefixes.is_empty());
        assert_eq!(config.review.mode, ReviewMode::Defer);
        assert_eq!(config.review.recent_count, 5);
        assert_eq!(config.review.excerpt_chars, 200);
        assert!(!config.merge_order.enabled);
        assert_eq!(config.close.draft_inactive_days, 21);
    }

    #[test]
    fn test_review_mode_from_str() {
        assert_eq!("judge".parse::<ReviewMode>().unwrap(), ReviewMode::Judge);
        assert_eq!(" DEFER ".parse::<ReviewMode>().unwrap(), ReviewMode::Defer);
        assert!("maybe".parse::<ReviewMode>().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[ranking]\npriority_labels = [\"urgent\"]\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.ranking.priority_labels, vec!["urgent".to_string()]);
    }

    #[test]
    fn test_load_from_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[staleness\nmax_age_days = ").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
    }
}
