use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One changed file as reported by a diff source.
///
/// # Examples
///
/// ```
/// use revue_core::ChangeSummaryEntry;
///
/// let entry = ChangeSummaryEntry::new("src/app.ts", 12, 3);
/// assert_eq!(entry.insertions, 12);
/// assert!(!entry.binary);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummaryEntry {
    /// Path relative to the repository root.
    pub file_path: String,
    /// Lines added in this file.
    pub insertions: u64,
    /// Lines removed from this file.
    pub deletions: u64,
    /// Binary files carry no line counts.
    #[serde(default)]
    pub binary: bool,
}

impl ChangeSummaryEntry {
    /// Create a text-file entry.
    pub fn new(file_path: impl Into<String>, insertions: u64, deletions: u64) -> Self {
        Self {
            file_path: file_path.into(),
            insertions,
            deletions,
            binary: false,
        }
    }
}

/// Severity of a flagged security issue.
///
/// Ordered so that `Low < Medium < High`.
///
/// # Examples
///
/// ```
/// use revue_core::Severity;
///
/// let s: Severity = serde_json::from_str("\"high\"").unwrap();
/// assert_eq!(s, Severity::High);
/// assert!(Severity::High > Severity::Medium);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Worth a glance.
    Low,
    /// Likely worth fixing.
    Medium,
    /// Should be looked at before merging.
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

impl Severity {
    /// Returns `true` if `self` is at least as severe as `threshold`.
    ///
    /// # Examples
    ///
    /// ```
    /// use revue_core::Severity;
    ///
    /// assert!(Severity::High.meets_threshold(Severity::Medium));
    /// assert!(Severity::Medium.meets_threshold(Severity::Medium));
    /// assert!(!Severity::Low.meets_threshold(Severity::Medium));
    /// ```
    pub fn meets_threshold(self, threshold: Severity) -> bool {
        self >= threshold
    }
}

/// A line in a diff that matched a security indicator.
///
/// `line` is the 1-based position of the line among the *added* lines of the
/// file's diff (lines starting with `+` but not `+++`). It is not the line
/// number in the file itself.
///
/// # Examples
///
/// ```
/// use revue_core::{SecurityIssue, Severity};
///
/// let issue = SecurityIssue {
///     file: "src/db.ts".into(),
///     line: Some(4),
///     severity: Severity::Medium,
///     description: "Potential SQL injection".into(),
/// };
/// assert_eq!(issue.line, Some(4));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityIssue {
    /// File the issue was found in.
    pub file: String,
    /// Index within the added lines of the diff (1-based).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// How serious the indicator is.
    pub severity: Severity,
    /// Human-readable description of the indicator.
    pub description: String,
}

/// Aggregate metrics for one set of changes.
///
/// # Examples
///
/// ```
/// use revue_core::CodeMetricsResult;
///
/// let result = CodeMetricsResult::default();
/// assert_eq!(result.files_changed, 0);
/// assert_eq!(result.complexity_score, 0.0);
/// let json = serde_json::to_value(&result).unwrap();
/// assert!(json.get("complexityScore").is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeMetricsResult {
    /// Total insertions across all files.
    pub lines_added: u64,
    /// Total deletions across all files.
    pub lines_removed: u64,
    /// Number of files analyzed.
    pub files_changed: usize,
    /// Mean per-file complexity, rounded to two decimals.
    pub complexity_score: f64,
    /// Issues in file order, then line order, then rule order.
    pub security_issues: Vec<SecurityIssue>,
}

impl CodeMetricsResult {
    /// Returns `true` if any issue is at least as severe as `threshold`.
    pub fn has_issues_at(&self, threshold: Severity) -> bool {
        self.security_issues
            .iter()
            .any(|i| i.severity.meets_threshold(threshold))
    }

    /// Count issues with exactly the given severity.
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.security_issues
            .iter()
            .filter(|i| i.severity == severity)
            .count()
    }
}

/// Conventional commit type.
///
/// # Examples
///
/// ```
/// use revue_core::CommitType;
///
/// let t: CommitType = "feat".parse().unwrap();
/// assert_eq!(t.to_string(), "feat");
/// assert!("feature".parse::<CommitType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
    Feat,
    Fix,
    Docs,
    Style,
    Refactor,
    Perf,
    Test,
    Chore,
}

impl CommitType {
    /// Every commit type, in the order advertised to the model.
    pub const ALL: [CommitType; 8] = [
        CommitType::Feat,
        CommitType::Fix,
        CommitType::Docs,
        CommitType::Style,
        CommitType::Refactor,
        CommitType::Perf,
        CommitType::Test,
        CommitType::Chore,
    ];

    /// The lowercase keyword used in commit headers.
    pub fn as_str(self) -> &'static str {
        match self {
            CommitType::Feat => "feat",
            CommitType::Fix => "fix",
            CommitType::Docs => "docs",
            CommitType::Style => "style",
            CommitType::Refactor => "refactor",
            CommitType::Perf => "perf",
            CommitType::Test => "test",
            CommitType::Chore => "chore",
        }
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommitType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("unknown commit type: {s}"))
    }
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use revue_core::OutputFormat;
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "markdown".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn severity_orders_low_to_high() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High.meets_threshold(Severity::Low));
        assert!(!Severity::Medium.meets_threshold(Severity::High));
    }

    #[test]
    fn severity_from_str_is_case_insensitive() {
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!("Medium".parse::<Severity>().unwrap(), Severity::Medium);
        assert!("critical".parse::<Severity>().is_err());
    }

    #[test]
    fn security_issue_omits_missing_line() {
        let issue = SecurityIssue {
            file: "a.js".into(),
            line: None,
            severity: Severity::Low,
            description: "x".into(),
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert!(json.get("line").is_none());
        assert_eq!(json["severity"], "low");
    }

    #[test]
    fn metrics_result_serializes_camel_case() {
        let result = CodeMetricsResult {
            lines_added: 8,
            lines_removed: 1,
            files_changed: 2,
            complexity_score: 1.75,
            security_issues: vec![],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["linesAdded"], 8);
        assert_eq!(json["linesRemoved"], 1);
        assert_eq!(json["filesChanged"], 2);
        assert_eq!(json["complexityScore"], 1.75);
        assert!(json["securityIssues"].as_array().unwrap().is_empty());
    }

    #[test]
    fn metrics_threshold_helpers() {
        let issue = |severity| SecurityIssue {
            file: "f".into(),
            line: Some(1),
            severity,
            description: "d".into(),
        };
        let result = CodeMetricsResult {
            security_issues: vec![issue(Severity::Medium), issue(Severity::Medium)],
            ..CodeMetricsResult::default()
        };
        assert!(result.has_issues_at(Severity::Low));
        assert!(result.has_issues_at(Severity::Medium));
        assert!(!result.has_issues_at(Severity::High));
        assert_eq!(result.count_severity(Severity::Medium), 2);
        assert_eq!(result.count_severity(Severity::High), 0);
    }

    #[test]
    fn commit_type_roundtrip() {
        for t in CommitType::ALL {
            assert_eq!(t.as_str().parse::<CommitType>().unwrap(), t);
        }
        let json = serde_json::to_string(&CommitType::Refactor).unwrap();
        assert_eq!(json, "\"refactor\"");
    }
}
