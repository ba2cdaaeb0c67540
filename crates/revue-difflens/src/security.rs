//! Naive security indicators over the added lines of a diff.
//!
//! Only lines that start with `+` (and not `+++`) are looked at. An added
//! line whose content itself begins with `++` is therefore skipped.

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use revue_core::{SecurityIssue, Severity};

/// One indicator: a case-insensitive pattern and what a match means.
#[derive(Debug, Clone)]
pub struct SecurityRule {
    /// Tested against each trimmed added line.
    pub pattern: Regex,
    /// Severity of every issue this rule raises.
    pub severity: Severity,
    /// Copied into every issue this rule raises.
    pub description: &'static str,
}

impl SecurityRule {
    /// Build a rule from an already compiled pattern.
    pub fn new(pattern: Regex, severity: Severity, description: &'static str) -> Self {
        Self {
            pattern,
            severity,
            description,
        }
    }

    fn builtin(pattern: &str, severity: Severity, description: &'static str) -> Self {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .expect("valid regex");
        Self::new(pattern, severity, description)
    }
}

/// Built-in indicators, in reporting order.
pub fn default_rules() -> &'static [SecurityRule] {
    static RULES: OnceLock<Vec<SecurityRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            SecurityRule::builtin(
                r"password|secret|token|key",
                Severity::High,
                "Potential hardcoded credentials",
            ),
            SecurityRule::builtin(r"eval\s*\(", Severity::High, "Unsafe eval() usage"),
            SecurityRule::builtin(r"exec\s*\(", Severity::Medium, "Command execution detected"),
            SecurityRule::builtin(
                r"innerHTML|outerHTML",
                Severity::Medium,
                "Potential XSS vulnerability",
            ),
            SecurityRule::builtin(r"sql\s*=", Severity::Medium, "Potential SQL injection"),
        ]
    })
}

/// The added lines of a diff, `+` stripped and trimmed, in order.
///
/// # Examples
///
/// ```
/// use revue_difflens::security::added_lines;
///
/// let diff = "+++ b/a.js\n@@ -0,0 +1,2 @@\n+  let a = 1;\n-let b;\n+\n";
/// assert_eq!(added_lines(diff), vec!["let a = 1;", ""]);
/// ```
pub fn added_lines(diff_text: &str) -> Vec<&str> {
    diff_text
        .split('\n')
        .filter(|line| line.starts_with('+') && !line.starts_with("+++"))
        .map(|line| line[1..].trim())
        .collect()
}

/// Scans added lines against an ordered rule table.
///
/// # Examples
///
/// ```
/// use revue_core::Severity;
/// use revue_difflens::security::SecurityScanner;
///
/// let issues = SecurityScanner::default().scan("+el.innerHTML = html;", "ui.js");
/// assert_eq!(issues.len(), 1);
/// assert_eq!(issues[0].severity, Severity::Medium);
/// assert_eq!(issues[0].line, Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct SecurityScanner {
    rules: Vec<SecurityRule>,
}

impl Default for SecurityScanner {
    fn default() -> Self {
        Self {
            rules: default_rules().to_vec(),
        }
    }
}

impl SecurityScanner {
    /// Use a custom rule table instead of the built-in one.
    pub fn with_rules(rules: Vec<SecurityRule>) -> Self {
        Self { rules }
    }

    /// Flag every (added line, rule) pair that matches, ordered by line
    /// and then by rule.
    pub fn scan(&self, diff_text: &str, file_path: &str) -> Vec<SecurityIssue> {
        scan_with(&self.rules, diff_text, file_path)
    }
}

/// Scan with the built-in rules.
///
/// # Examples
///
/// ```
/// use revue_difflens::security::scan;
///
/// let diff = "+++ b/auth.ts\n+  const password = \"abc123\";\n";
/// let issues = scan(diff, "auth.ts");
/// assert_eq!(issues.len(), 1);
/// assert_eq!(issues[0].description, "Potential hardcoded credentials");
/// ```
pub fn scan(diff_text: &str, file_path: &str) -> Vec<SecurityIssue> {
    scan_with(default_rules(), diff_text, file_path)
}

fn scan_with(rules: &[SecurityRule], diff_text: &str, file_path: &str) -> Vec<SecurityIssue> {
    let mut issues = Vec::new();
    for (idx, line) in added_lines(diff_text).into_iter().enumerate() {
        for rule in rules.iter().filter(|r| r.pattern.is_match(line)) {
            issues.push(SecurityIssue {
                file: file_path.to_string(),
                line: Some(idx as u32 + 1),
                severity: rule.severity,
                description: rule.description.to_string(),
            });
        }
    }
    issues
}
