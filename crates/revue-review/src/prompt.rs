use std::path::Path;

use revue_core::{CodeMetricsResult, Severity};

use crate::tools::ReviewTool;

const SYSTEM_PROMPT: &str = "\
You are Revue, a senior code reviewer. You give clear, constructive and \
actionable feedback on code changes, and you care about correctness, \
readability and long-term maintainability.

Approach:
- Be professional, respectful and collaborative.
- Assume good intent and adapt to the author's level of experience.
- Take the chance to teach when it helps.

Look at:
1. Correctness: bugs, logic errors, unhandled edge cases, regressions.
2. Clarity: naming, structure, comments where the code is not obvious.
3. Maintainability: duplication, needless complexity, tight coupling.
4. Consistency: conventions and patterns already used in the codebase.
5. Performance: avoidable work and obvious bottlenecks.
6. Security: injection, unsafe evaluation, leaked secrets, unchecked input.
7. Testing: whether the change is covered by meaningful tests.
8. Robustness: error handling and behavior under load or bad input.

When you respond:
- Use plain language.
- For every issue, say why it matters and suggest a fix.
- Use bullet points and code blocks where they help.
- Skip nitpicks unless they hurt readability; mark the ones you keep with \"Nit:\".
- Call out what was done well.";

/// Build the system prompt, describing only the tools that are enabled.
///
/// # Examples
///
/// ```
/// use revue_review::prompt::build_system_prompt;
/// use revue_review::tools::ReviewTool;
///
/// let prompt = build_system_prompt(&[ReviewTool::FileChanges]);
/// assert!(prompt.contains("Revue"));
/// assert!(prompt.contains("get_file_changes_in_directory"));
/// assert!(!prompt.contains("write_review_to_markdown"));
/// ```
pub fn build_system_prompt(tools: &[ReviewTool]) -> String {
    let mut prompt = String::from(SYSTEM_PROMPT);

    prompt.push_str("\n\nTools:\n");
    for tool in tools {
        let usage = match tool {
            ReviewTool::FileChanges => "fetch the per-file diffs of a directory (root_dir).",
            ReviewTool::CommitMessage => {
                "build a conventional commit message (root_dir, summary, type one of \
                 feat/fix/docs/style/refactor/perf/test/chore, optional scope)."
            }
            ReviewTool::WriteReport => {
                "save the complete review as markdown (root_dir, review, optional \
                 filename, default code-review.md)."
            }
        };
        prompt.push_str(&format!("- {}: {usage}\n", tool.name()));
    }

    prompt.push_str("\nWorkflow:\n");
    let mut step = 1;
    let mut push_step = |text: &str| {
        prompt.push_str(&format!("{step}. {text}\n"));
        step += 1;
    };
    push_step("Call get_file_changes_in_directory to see the changes.");
    push_step("Review the changes.");
    if tools.contains(&ReviewTool::CommitMessage) {
        push_step("Call generate_commit_message to suggest a commit message.");
    }
    if tools.contains(&ReviewTool::WriteReport) {
        push_step("Call write_review_to_markdown with your complete review.");
    }
    push_step("Reply with the full review as your final message.");

    prompt
}

/// Build the user prompt asking for a review of `root_dir`, with the
/// lexical metrics as extra context.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use revue_core::CodeMetricsResult;
/// use revue_review::prompt::build_review_prompt;
///
/// let prompt = build_review_prompt(Path::new("/repo"), &CodeMetricsResult::default());
/// assert!(prompt.contains("/repo"));
/// assert!(prompt.contains("0 files changed"));
/// ```
pub fn build_review_prompt(root_dir: &Path, metrics: &CodeMetricsResult) -> String {
    let mut prompt = format!(
        "Review the code changes in the directory: {}\n\n",
        root_dir.display()
    );
    prompt.push_str(&metrics_summary(metrics));
    prompt
}

/// Short plain-text digest of the metrics for the model.
pub fn metrics_summary(metrics: &CodeMetricsResult) -> String {
    let mut out = format!(
        "Automated metrics (heuristic, pattern based): {} files changed, +{} -{} lines, \
         complexity score {:.2}.\n",
        metrics.files_changed,
        metrics.lines_added,
        metrics.lines_removed,
        metrics.complexity_score
    );

    if metrics.security_issues.is_empty() {
        out.push_str("No security indicators were flagged.\n");
        return out;
    }

    out.push_str(&format!(
        "Security indicators flagged: {} high, {} medium, {} low. Verify each one, \
         many are false positives:\n",
        metrics.count_severity(Severity::High),
        metrics.count_severity(Severity::Medium),
        metrics.count_severity(Severity::Low),
    ));
    for issue in &metrics.security_issues {
        let at = issue
            .line
            .map(|l| format!(" (added line {l})"))
            .unwrap_or_default();
        out.push_str(&format!(
            "- [{}] {}{at}: {}\n",
            issue.severity, issue.file, issue.description
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use revue_core::SecurityIssue;

    #[test]
    fn all_tools_produce_full_workflow() {
        let prompt = build_system_prompt(&ReviewTool::ALL);
        for tool in ReviewTool::ALL {
            assert!(prompt.contains(tool.name()));
        }
        assert!(prompt.contains("5. Reply with the full review"));
    }

    #[test]
    fn disabled_steps_are_left_out() {
        let prompt = build_system_prompt(&[ReviewTool::FileChanges, ReviewTool::WriteReport]);
        assert!(!prompt.contains("generate_commit_message"));
        assert!(prompt.contains("3. Call write_review_to_markdown"));
        assert!(prompt.contains("4. Reply with the full review"));
    }

    #[test]
    fn metrics_summary_lists_issues() {
        let metrics = CodeMetricsResult {
            lines_added: 10,
            lines_removed: 2,
            files_changed: 3,
            complexity_score: 1.83,
            security_issues: vec![SecurityIssue {
                file: "src/db.ts".into(),
                line: Some(3),
                severity: Severity::Medium,
                description: "Potential SQL injection".into(),
            }],
        };
        let summary = metrics_summary(&metrics);
        assert!(summary.contains("3 files changed, +10 -2 lines"));
        assert!(summary.contains("complexity score 1.83"));
        assert!(summary.contains("0 high, 1 medium, 0 low"));
        assert!(summary.contains("- [medium] src/db.ts (added line 3): Potential SQL injection"));
    }

    #[test]
    fn review_prompt_without_issues() {
        let prompt = build_review_prompt(Path::new("."), &CodeMetricsResult::default());
        assert!(prompt.starts_with("Review the code changes in the directory: ."));
        assert!(prompt.contains("No security indicators were flagged."));
    }
}
