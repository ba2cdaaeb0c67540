//! Aggregate complexity and security metrics across every changed file.
//!
//! Files are measured one at a time in summary order and folded into a
//! running total. The complexity score is averaged once at the end; with no
//! files the raw sum (zero) is left as is.

use std::fmt;

use revue_core::{ChangeSummaryEntry, CodeMetricsResult, RevueError, SecurityIssue};
use serde::Serialize;
use tracing::debug;

use crate::complexity::{round2, ComplexityEstimator};
use crate::filter::PathFilter;
use crate::security::SecurityScanner;
use crate::source::DiffSource;

/// Measurements for one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetrics {
    /// File path.
    pub path: String,
    /// Lines added in this file.
    pub insertions: u64,
    /// Lines removed from this file.
    pub deletions: u64,
    /// Whether the file is binary.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub binary: bool,
    /// Complexity score of this file's diff.
    pub complexity: f64,
    /// Number of security issues raised in this file.
    pub issue_count: usize,
}

/// Full metrics output: the aggregate plus the per-file breakdown.
///
/// Serializes as the flat [`CodeMetricsResult`] fields with `perFile` and
/// `skipped` alongside.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    /// Aggregate result.
    #[serde(flatten)]
    pub metrics: CodeMetricsResult,
    /// Per-file breakdown, in summary order.
    pub per_file: Vec<FileMetrics>,
    /// Paths dropped by the exclusion filter.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

/// Runs the complexity estimator and security scanner over a diff source.
///
/// # Examples
///
/// ```
/// use revue_core::ChangeSummaryEntry;
/// use revue_difflens::metrics::MetricsAggregator;
/// use revue_difflens::source::PatchDiffSource;
///
/// let source = PatchDiffSource::parse(
///     "--- a/a.js\n+++ b/a.js\n@@ -1 +1,2 @@\n x\n+if (y) eval(z);\n",
/// )
/// .unwrap();
/// let files = vec![ChangeSummaryEntry::new("a.js", 1, 0)];
/// let result = MetricsAggregator::default()
///     .compute_metrics(&source, &files)
///     .unwrap();
/// assert_eq!(result.files_changed, 1);
/// assert_eq!(result.complexity_score, 1.5);
/// assert_eq!(result.security_issues.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    complexity: ComplexityEstimator,
    security: SecurityScanner,
}

#[derive(Default)]
struct Totals {
    result: CodeMetricsResult,
    per_file: Vec<FileMetrics>,
}

impl Totals {
    fn add(mut self, file: FileMetrics, issues: Vec<SecurityIssue>) -> Self {
        self.result.lines_added += file.insertions;
        self.result.lines_removed += file.deletions;
        self.result.files_changed += 1;
        self.result.complexity_score += file.complexity;
        self.result.security_issues.extend(issues);
        self.per_file.push(file);
        self
    }

    fn finish(mut self) -> (CodeMetricsResult, Vec<FileMetrics>) {
        if self.result.files_changed > 0 {
            self.result.complexity_score =
                round2(self.result.complexity_score / self.result.files_changed as f64);
        }
        (self.result, self.per_file)
    }
}

impl MetricsAggregator {
    /// Build an aggregator with custom estimators.
    pub fn new(complexity: ComplexityEstimator, security: SecurityScanner) -> Self {
        Self {
            complexity,
            security,
        }
    }

    /// Fetch one file's diff and measure it.
    ///
    /// # Errors
    ///
    /// Returns any error from [`DiffSource::diff`].
    pub fn measure_file(
        &self,
        source: &dyn DiffSource,
        entry: &ChangeSummaryEntry,
    ) -> Result<(FileMetrics, Vec<SecurityIssue>), RevueError> {
        let text = source.diff(&entry.file_path)?;
        let complexity = self.complexity.estimate(&text);
        let issues = self.security.scan(&text, &entry.file_path);
        debug!(
            file = %entry.file_path,
            insertions = entry.insertions,
            deletions = entry.deletions,
            complexity,
            issues = issues.len(),
            "scanned file"
        );

        let metrics = FileMetrics {
            path: entry.file_path.clone(),
            insertions: entry.insertions,
            deletions: entry.deletions,
            binary: entry.binary,
            complexity,
            issue_count: issues.len(),
        };
        Ok((metrics, issues))
    }

    /// Measure `changed_files` and keep the per-file breakdown.
    ///
    /// # Errors
    ///
    /// The first diff that cannot be fetched aborts the whole run.
    pub fn report(
        &self,
        source: &dyn DiffSource,
        changed_files: &[ChangeSummaryEntry],
    ) -> Result<MetricsReport, RevueError> {
        let totals = changed_files
            .iter()
            .try_fold(Totals::default(), |totals, entry| {
                let (file, issues) = self.measure_file(source, entry)?;
                Ok::<_, RevueError>(totals.add(file, issues))
            })?;
        let (metrics, per_file) = totals.finish();
        Ok(MetricsReport {
            metrics,
            per_file,
            skipped: Vec::new(),
        })
    }

    /// Measure `changed_files` exactly as given.
    ///
    /// # Errors
    ///
    /// The first diff that cannot be fetched aborts the whole run.
    pub fn compute_metrics(
        &self,
        source: &dyn DiffSource,
        changed_files: &[ChangeSummaryEntry],
    ) -> Result<CodeMetricsResult, RevueError> {
        Ok(self.report(source, changed_files)?.metrics)
    }

    /// Summarize `source`, drop excluded paths, then measure what is left.
    ///
    /// # Errors
    ///
    /// Returns any error from [`DiffSource::summary`] or [`DiffSource::diff`].
    pub fn analyze(
        &self,
        source: &dyn DiffSource,
        filter: &PathFilter,
    ) -> Result<MetricsReport, RevueError> {
        let filtered = filter.apply(source.summary()?);
        let mut report = self.report(source, &filtered.kept)?;
        report.skipped = filtered.skipped.into_iter().map(|s| s.path).collect();
        Ok(report)
    }
}

/// [`MetricsAggregator::compute_metrics`] with the built-in rules.
///
/// # Errors
///
/// The first diff that cannot be fetched aborts the whole run.
///
/// # Examples
///
/// ```
/// use revue_difflens::metrics::compute_metrics;
/// use revue_difflens::source::PatchDiffSource;
///
/// let result = compute_metrics(&PatchDiffSource::default(), &[]).unwrap();
/// assert_eq!(result.files_changed, 0);
/// assert_eq!(result.complexity_score, 0.0);
/// ```
pub fn compute_metrics(
    source: &dyn DiffSource,
    changed_files: &[ChangeSummaryEntry],
) -> Result<CodeMetricsResult, RevueError> {
    MetricsAggregator::default().compute_metrics(source, changed_files)
}

/// [`MetricsAggregator::analyze`] with the built-in rules.
///
/// # Errors
///
/// Returns any error from the diff source.
pub fn analyze(source: &dyn DiffSource, filter: &PathFilter) -> Result<MetricsReport, RevueError> {
    MetricsAggregator::default().analyze(source, filter)
}

fn issue_location(issue: &SecurityIssue) -> String {
    match issue.line {
        Some(line) => format!("{} (added line {line})", issue.file),
        None => issue.file.clone(),
    }
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.metrics;
        writeln!(f, "Code Metrics")?;
        writeln!(f, "============")?;
        writeln!(
            f,
            "Complexity: {:.2}   Files: {}   Lines: +{} -{}\n",
            m.complexity_score, m.files_changed, m.lines_added, m.lines_removed
        )?;

        if !self.per_file.is_empty() {
            writeln!(
                f,
                "{:<44} {:>12} {:>10} {:>6}",
                "File", "+/-", "Complexity", "Issues"
            )?;
            writeln!(f, "{}", "-".repeat(75))?;
            for fm in &self.per_file {
                let lines = if fm.binary {
                    "binary".to_string()
                } else {
                    format!("+{}/-{}", fm.insertions, fm.deletions)
                };
                writeln!(
                    f,
                    "{:<44} {:>12} {:>10.2} {:>6}",
                    fm.path, lines, fm.complexity, fm.issue_count
                )?;
            }
            writeln!(f)?;
        }

        if m.security_issues.is_empty() {
            writeln!(f, "No security issues found.")?;
        } else {
            writeln!(f, "Security Issues ({})", m.security_issues.len())?;
            for issue in &m.security_issues {
                writeln!(
                    f,
                    "  [{:<6}] {}: {}",
                    issue.severity.to_string(),
                    issue_location(issue),
                    issue.description
                )?;
            }
        }

        if !self.skipped.is_empty() {
            writeln!(f, "\nSkipped: {}", self.skipped.join(", "))?;
        }
        Ok(())
    }
}

impl MetricsReport {
    /// Render the report as a markdown string.
    ///
    /// # Examples
    ///
    /// ```
    /// use revue_difflens::metrics::MetricsReport;
    ///
    /// let md = MetricsReport::default().to_markdown();
    /// assert!(md.contains("# Code Metrics"));
    /// assert!(md.contains("No security issues found."));
    /// ```
    pub fn to_markdown(&self) -> String {
        let m = &self.metrics;
        let mut out = String::new();
        out.push_str("# Code Metrics\n\n");
        out.push_str(&format!(
            "**Complexity:** {:.2} | **Files:** {} | **Lines:** +{} / -{}\n\n",
            m.complexity_score, m.files_changed, m.lines_added, m.lines_removed
        ));

        if !self.per_file.is_empty() {
            out.push_str("| File | +/- | Complexity | Issues |\n");
            out.push_str("|------|-----|------------|--------|\n");
            for fm in &self.per_file {
                let lines = if fm.binary {
                    "binary".to_string()
                } else {
                    format!("+{}/-{}", fm.insertions, fm.deletions)
                };
                out.push_str(&format!(
                    "| `{}` | {} | {:.2} | {} |\n",
                    fm.path, lines, fm.complexity, fm.issue_count
                ));
            }
            out.push('\n');
        }

        if m.security_issues.is_empty() {
            out.push_str("No security issues found.\n");
        } else {
            out.push_str("## Security Issues\n\n");
            for issue in &m.security_issues {
                out.push_str(&format!(
                    "- **{}** `{}`: {}\n",
                    issue.severity,
                    issue_location(issue),
                    issue.description
                ));
            }
        }

        if !self.skipped.is_empty() {
            out.push_str(&format!("\n_Skipped:_ {}\n", self.skipped.join(", ")));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complexity::estimate;
    use crate::source::PatchDiffSource;
    use revue_core::Severity;

    const TWO_FILES: &str = "\
diff --git a/src/a.ts b/src/a.ts
--- a/src/a.ts
+++ b/src/a.ts
@@ -1,2 +1,5 @@
-let x = 0;
+if (ready) {
+  start();
+}
+const token = load();
 done();
diff --git a/src/b.ts b/src/b.ts
--- a/src/b.ts
+++ b/src/b.ts
@@ -1,1 +1,6 @@
 export {};
+for (const a of b) {
+  while (a) {
+    a--;
+  }
+}
";

    struct FailingSource;

    impl DiffSource for FailingSource {
        fn summary(&self) -> Result<Vec<ChangeSummaryEntry>, RevueError> {
            Err(RevueError::Git("backend unavailable".into()))
        }

        fn diff(&self, _file_path: &str) -> Result<String, RevueError> {
            Err(RevueError::Git("backend unavailable".into()))
        }
    }

    #[test]
    fn zero_files_leaves_raw_sum() {
        let result = compute_metrics(&PatchDiffSource::default(), &[]).unwrap();
        assert_eq!(result, CodeMetricsResult::default());
        assert!(!result.complexity_score.is_nan());
    }

    #[test]
    fn totals_and_mean_complexity() {
        let source = PatchDiffSource::parse(TWO_FILES).unwrap();
        let files = vec![
            ChangeSummaryEntry::new("src/a.ts", 3, 1),
            ChangeSummaryEntry::new("src/b.ts", 5, 0),
        ];
        let result = compute_metrics(&source, &files).unwrap();
        assert_eq!(result.lines_added, 8);
        assert_eq!(result.lines_removed, 1);
        assert_eq!(result.files_changed, 2);

        let c1 = estimate(&source.diff("src/a.ts").unwrap());
        let c2 = estimate(&source.diff("src/b.ts").unwrap());
        assert_eq!(c1, 1.5);
        assert_eq!(c2, 3.0);
        assert_eq!(result.complexity_score, round2((c1 + c2) / 2.0));
        assert_eq!(result.complexity_score, 2.25);
    }

    #[test]
    fn mean_complexity_rounds_the_stored_value() {
        let patch: String = ["+y", "+y", "+y", "+} else {"]
            .iter()
            .enumerate()
            .map(|(i, line)| {
                format!(
                    "diff --git a/f{i}.js b/f{i}.js\n--- a/f{i}.js\n+++ b/f{i}.js\n\
                     @@ -1 +1,2 @@\n x\n{line}\n"
                )
            })
            .collect();
        let source = PatchDiffSource::parse(&patch).unwrap();
        let files = source.summary().unwrap();
        assert_eq!(files.len(), 4);

        let result = compute_metrics(&source, &files).unwrap();
        // (1.0 + 1.0 + 1.0 + 1.3) / 4 is stored just below 1.075.
        assert_eq!(result.complexity_score, 1.07);
    }

    #[test]
    fn counts_come_from_summary_not_diff_text() {
        let source = PatchDiffSource::parse(TWO_FILES).unwrap();
        let files = vec![ChangeSummaryEntry::new("src/b.ts", 100, 7)];
        let result = compute_metrics(&source, &files).unwrap();
        assert_eq!((result.lines_added, result.lines_removed), (100, 7));
    }

    #[test]
    fn issues_follow_file_order() {
        let source = PatchDiffSource::parse(TWO_FILES).unwrap();
        let files = source.summary().unwrap();
        let result = compute_metrics(&source, &files).unwrap();
        assert_eq!(result.security_issues.len(), 1);
        let issue = &result.security_issues[0];
        assert_eq!(issue.file, "src/a.ts");
        assert_eq!(issue.line, Some(4));
        assert_eq!(issue.severity, Severity::High);
    }

    #[test]
    fn failing_diff_aborts_everything() {
        let files = vec![ChangeSummaryEntry::new("a.ts", 1, 0)];
        let err = compute_metrics(&FailingSource, &files).unwrap_err();
        assert!(matches!(err, RevueError::Git(_)));
    }

    #[test]
    fn missing_file_in_patch_aborts() {
        let source = PatchDiffSource::parse(TWO_FILES).unwrap();
        let files = vec![
            ChangeSummaryEntry::new("src/a.ts", 3, 1),
            ChangeSummaryEntry::new("src/gone.ts", 1, 1),
        ];
        assert!(matches!(
            compute_metrics(&source, &files),
            Err(RevueError::FileNotFound(_))
        ));
    }

    #[test]
    fn analyze_filters_before_fetching() {
        let patch = format!(
            "{TWO_FILES}diff --git a/dist/bundle.js b/dist/bundle.js\n\
             --- a/dist/bundle.js\n\
             +++ b/dist/bundle.js\n\
             @@ -1 +1 @@\n\
             -eval(a)\n\
             +eval(b)\n"
        );
        let source = PatchDiffSource::parse(&patch).unwrap();
        let report = analyze(&source, &PathFilter::default()).unwrap();
        assert_eq!(report.metrics.files_changed, 2);
        assert_eq!(report.skipped, vec!["dist/bundle.js"]);
        assert!(report
            .metrics
            .security_issues
            .iter()
            .all(|i| i.file != "dist/bundle.js"));
    }

    #[test]
    fn analyze_propagates_summary_failure() {
        assert!(analyze(&FailingSource, &PathFilter::default()).is_err());
    }

    #[test]
    fn report_serializes_flat() {
        let source = PatchDiffSource::parse(TWO_FILES).unwrap();
        let report = analyze(&source, &PathFilter::none()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["filesChanged"], 2);
        assert_eq!(json["complexityScore"], 2.25);
        assert_eq!(json["perFile"][1]["path"], "src/b.ts");
        assert_eq!(json["perFile"][0]["issueCount"], 1);
        assert!(json.get("skipped").is_none());
        assert!(json["perFile"][0].get("binary").is_none());
    }

    #[test]
    fn display_and_markdown_output() {
        let source = PatchDiffSource::parse(TWO_FILES).unwrap();
        let report = analyze(&source, &PathFilter::none()).unwrap();

        let text = report.to_string();
        assert!(text.contains("Code Metrics"));
        assert!(text.contains("Complexity: 2.25"));
        assert!(text.contains("src/b.ts"));
        assert!(text.contains("src/a.ts (added line 4): Potential hardcoded credentials"));

        let md = report.to_markdown();
        assert!(md.contains("# Code Metrics"));
        assert!(md.contains("| `src/a.ts` | +4/-1 | 1.50 | 1 |"));
        assert!(md.contains("## Security Issues"));
    }
}
