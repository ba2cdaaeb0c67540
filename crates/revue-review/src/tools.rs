//! The three tools offered to the model during a review.
//!
//! Each tool has a JSON-schema definition for function calling, a typed
//! argument struct, and a plain function doing the work so the MCP server
//! and the CLI can call the same code directly.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use revue_core::{CommitType, ReviewConfig, RevueError};
use revue_difflens::filter::PathFilter;
use revue_difflens::metrics::{analyze, MetricsReport};
use revue_difflens::source::{DiffSource, GitDiffSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::llm::ToolSpec;

/// Report file name used when the model does not pick one.
pub const DEFAULT_REPORT_FILENAME: &str = "code-review.md";

/// A tool the model can call.
///
/// # Examples
///
/// ```
/// use revue_review::tools::ReviewTool;
///
/// let tool: ReviewTool = "generate_commit_message".parse().unwrap();
/// assert_eq!(tool, ReviewTool::CommitMessage);
/// assert_eq!(tool.spec().name, "generate_commit_message");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewTool {
    /// Per-file diffs of the working tree.
    FileChanges,
    /// Conventional commit header.
    CommitMessage,
    /// Dated markdown report on disk.
    WriteReport,
}

impl ReviewTool {
    /// Every tool, in the order advertised to the model.
    pub const ALL: [ReviewTool; 3] = [
        ReviewTool::FileChanges,
        ReviewTool::CommitMessage,
        ReviewTool::WriteReport,
    ];

    /// Function name exposed to the model.
    pub fn name(self) -> &'static str {
        match self {
            ReviewTool::FileChanges => "get_file_changes_in_directory",
            ReviewTool::CommitMessage => "generate_commit_message",
            ReviewTool::WriteReport => "write_review_to_markdown",
        }
    }

    /// One-line description exposed to the model.
    pub fn description(self) -> &'static str {
        match self {
            ReviewTool::FileChanges => "Gets the code changes made in the given directory",
            ReviewTool::CommitMessage => {
                "Generates a conventional commit message based on the code changes"
            }
            ReviewTool::WriteReport => "Writes the code review to a markdown file",
        }
    }

    /// JSON schema of the arguments object.
    pub fn parameters(self) -> serde_json::Value {
        let root_dir = serde_json::json!({
            "type": "string",
            "minLength": 1,
            "description": "The root directory",
        });
        match self {
            ReviewTool::FileChanges => serde_json::json!({
                "type": "object",
                "properties": { "root_dir": root_dir },
                "required": ["root_dir"],
            }),
            ReviewTool::CommitMessage => serde_json::json!({
                "type": "object",
                "properties": {
                    "root_dir": root_dir,
                    "summary": {
                        "type": "string",
                        "minLength": 1,
                        "description": "A summary of the changes made",
                    },
                    "type": {
                        "type": "string",
                        "enum": CommitType::ALL.map(CommitType::as_str),
                        "description": "The type of change",
                    },
                    "scope": {
                        "type": "string",
                        "description": "The scope of the change",
                    },
                },
                "required": ["root_dir", "summary", "type"],
            }),
            ReviewTool::WriteReport => serde_json::json!({
                "type": "object",
                "properties": {
                    "root_dir": root_dir,
                    "review": {
                        "type": "string",
                        "minLength": 1,
                        "description": "The code review content",
                    },
                    "filename": {
                        "type": "string",
                        "minLength": 1,
                        "default": DEFAULT_REPORT_FILENAME,
                        "description": "The filename to save the review as",
                    },
                },
                "required": ["root_dir", "review"],
            }),
        }
    }

    /// Function definition handed to the model.
    pub fn spec(self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

impl fmt::Display for ReviewTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ReviewTool {
    type Err = RevueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReviewTool::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| RevueError::Tool(format!("unknown tool: {s}")))
    }
}

/// Arguments of `get_file_changes_in_directory`.
#[derive(Debug, Clone, Deserialize)]
pub struct FileChangesArgs {
    #[serde(alias = "rootDir")]
    pub root_dir: String,
}

/// Arguments of `generate_commit_message`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitMessageArgs {
    #[serde(alias = "rootDir")]
    pub root_dir: String,
    pub summary: String,
    #[serde(rename = "type")]
    pub kind: CommitType,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Arguments of `write_review_to_markdown`.
#[derive(Debug, Clone, Deserialize)]
pub struct WriteReviewArgs {
    #[serde(alias = "rootDir")]
    pub root_dir: String,
    pub review: String,
    /// Falls back to the configured report file name.
    #[serde(default)]
    pub filename: Option<String>,
}

/// One changed file and its diff text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub file: String,
    pub diff: String,
}

/// Result of writing a review report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrittenReport {
    pub file_path: PathBuf,
    pub success: bool,
}

/// Output of a tool call, ready to be handed back to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    FileChanges(Vec<FileChange>),
    CommitMessage(String),
    Report {
        written: WrittenReport,
        review: String,
    },
}

impl ToolOutput {
    /// JSON payload of a `tool` message.
    ///
    /// # Examples
    ///
    /// ```
    /// use revue_review::tools::ToolOutput;
    ///
    /// let out = ToolOutput::CommitMessage("fix: handle empty input".into());
    /// assert_eq!(out.to_json()["commitMessage"], "fix: handle empty input");
    /// ```
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ToolOutput::FileChanges(changes) => serde_json::json!(changes),
            ToolOutput::CommitMessage(message) => {
                serde_json::json!({ "commitMessage": message })
            }
            ToolOutput::Report { written, .. } => serde_json::json!(written),
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), RevueError> {
    if value.trim().is_empty() {
        return Err(RevueError::Tool(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Every changed, non-excluded file under `root_dir` with its diff, in
/// summary order.
///
/// # Errors
///
/// Returns [`RevueError::Git`] if the repository cannot be read.
pub fn get_file_changes(
    root_dir: &Path,
    config: &ReviewConfig,
) -> Result<Vec<FileChange>, RevueError> {
    let source = GitDiffSource::open(root_dir, config.baseline.clone())?;
    let filtered = PathFilter::from_config(config).apply(source.summary()?);
    let mut changes = Vec::with_capacity(filtered.kept.len());
    for entry in filtered.kept {
        let diff = source.diff(&entry.file_path)?;
        changes.push(FileChange {
            file: entry.file_path,
            diff,
        });
    }
    debug!(files = changes.len(), "collected file changes");
    Ok(changes)
}

/// Lexical metrics for the working tree under `root_dir`.
///
/// # Errors
///
/// Returns [`RevueError::Git`] if the repository cannot be read.
pub fn code_metrics(root_dir: &Path, config: &ReviewConfig) -> Result<MetricsReport, RevueError> {
    let source = GitDiffSource::open(root_dir, config.baseline.clone())?;
    analyze(&source, &PathFilter::from_config(config))
}

/// Format a conventional commit header.
///
/// An empty scope is treated as no scope.
///
/// # Examples
///
/// ```
/// use revue_core::CommitType;
/// use revue_review::tools::commit_message;
///
/// assert_eq!(
///     commit_message(CommitType::Feat, Some("cli"), "add metrics command"),
///     "feat(cli): add metrics command"
/// );
/// assert_eq!(
///     commit_message(CommitType::Fix, None, "handle empty diff"),
///     "fix: handle empty diff"
/// );
/// ```
pub fn commit_message(kind: CommitType, scope: Option<&str>, summary: &str) -> String {
    match scope.filter(|s| !s.is_empty()) {
        Some(scope) => format!("{kind}({scope}): {summary}"),
        None => format!("{kind}: {summary}"),
    }
}

/// Report body: a dated title followed by the review.
///
/// # Examples
///
/// ```
/// use revue_review::tools::render_report;
///
/// assert_eq!(
///     render_report("2025-01-31", "Looks good."),
///     "# Code Review - 2025-01-31\n\nLooks good."
/// );
/// ```
pub fn render_report(date: &str, review: &str) -> String {
    format!("# Code Review - {date}\n\n{review}")
}

/// Reject report names that would land outside the root directory.
fn check_filename(filename: &str) -> Result<(), RevueError> {
    require("filename", filename)?;
    let path = Path::new(filename);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(RevueError::Tool(format!(
            "filename must be a relative path inside root_dir: {filename}"
        )));
    }
    Ok(())
}

/// Write `review` as a dated markdown report at `root_dir/filename`.
///
/// # Errors
///
/// Returns [`RevueError::Tool`] for an empty review or a filename that
/// leaves `root_dir`, and [`RevueError::Io`] if the file cannot be written.
pub fn write_review(
    root_dir: &Path,
    review: &str,
    filename: &str,
) -> Result<WrittenReport, RevueError> {
    require("review", review)?;
    check_filename(filename)?;

    let file_path = root_dir.join(filename);
    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let date = chrono::Utc::now().format("%Y-%m-%d").to_string();
    std::fs::write(&file_path, render_report(&date, review))?;
    info!(path = %file_path.display(), "wrote review report");

    Ok(WrittenReport {
        file_path,
        success: true,
    })
}

/// Resolve a tool's `root_dir` argument inside `base`.
///
/// Relative paths are joined onto `base`. The result must exist and stay
/// inside `base` once symlinks are resolved.
///
/// # Errors
///
/// Returns [`RevueError::Tool`] if the path is empty, missing, or escapes
/// `base`.
pub fn resolve_root(base: &Path, root_dir: &str) -> Result<PathBuf, RevueError> {
    require("root_dir", root_dir)?;
    let base = base
        .canonicalize()
        .map_err(|e| RevueError::Tool(format!("cannot resolve {}: {e}", base.display())))?;
    let candidate = base.join(root_dir);
    let resolved = candidate
        .canonicalize()
        .map_err(|e| RevueError::Tool(format!("cannot resolve root_dir '{root_dir}': {e}")))?;
    if !resolved.starts_with(&base) {
        return Err(RevueError::Tool(format!(
            "root_dir '{root_dir}' is outside the repository"
        )));
    }
    Ok(resolved)
}

/// The tool set for one review, bound to a repository.
///
/// # Examples
///
/// ```
/// use revue_core::ReviewConfig;
/// use revue_review::tools::{ReviewTool, ReviewTools};
///
/// let config = ReviewConfig { write_report: false, ..ReviewConfig::default() };
/// let tools = ReviewTools::new(".", config);
/// assert_eq!(
///     tools.enabled(),
///     &[ReviewTool::FileChanges, ReviewTool::CommitMessage]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct ReviewTools {
    base: PathBuf,
    config: ReviewConfig,
    enabled: Vec<ReviewTool>,
}

impl ReviewTools {
    /// Bind the tools to the repository at `base`; disabled tools follow
    /// `config.commit_message` and `config.write_report`.
    pub fn new(base: impl Into<PathBuf>, config: ReviewConfig) -> Self {
        let enabled = ReviewTool::ALL
            .into_iter()
            .filter(|t| match t {
                ReviewTool::FileChanges => true,
                ReviewTool::CommitMessage => config.commit_message,
                ReviewTool::WriteReport => config.write_report,
            })
            .collect();
        Self {
            base: base.into(),
            config,
            enabled,
        }
    }

    /// Repository the tools operate in.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Review settings in effect.
    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Tools offered to the model.
    pub fn enabled(&self) -> &[ReviewTool] {
        &self.enabled
    }

    /// Function definitions of the enabled tools.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.enabled.iter().map(|t| t.spec()).collect()
    }

    /// Run a tool by name with JSON-encoded arguments.
    ///
    /// # Errors
    ///
    /// Returns [`RevueError::Tool`] for unknown or disabled tools and
    /// invalid arguments, or whatever the tool itself fails with.
    pub fn execute(&self, name: &str, arguments: &str) -> Result<ToolOutput, RevueError> {
        let tool: ReviewTool = name.parse()?;
        if !self.enabled.contains(&tool) {
            return Err(RevueError::Tool(format!("tool {tool} is disabled")));
        }
        let arguments = if arguments.trim().is_empty() {
            "{}"
        } else {
            arguments
        };
        let bad_args =
            |e: serde_json::Error| RevueError::Tool(format!("invalid arguments for {tool}: {e}"));

        match tool {
            ReviewTool::FileChanges => {
                let args: FileChangesArgs = serde_json::from_str(arguments).map_err(bad_args)?;
                let root = resolve_root(&self.base, &args.root_dir)?;
                Ok(ToolOutput::FileChanges(get_file_changes(&root, &self.config)?))
            }
            ReviewTool::CommitMessage => {
                let args: CommitMessageArgs = serde_json::from_str(arguments).map_err(bad_args)?;
                require("root_dir", &args.root_dir)?;
                require("summary", &args.summary)?;
                Ok(ToolOutput::CommitMessage(commit_message(
                    args.kind,
                    args.scope.as_deref(),
                    args.summary.trim(),
                )))
            }
            ReviewTool::WriteReport => {
                let args: WriteReviewArgs = serde_json::from_str(arguments).map_err(bad_args)?;
                let root = resolve_root(&self.base, &args.root_dir)?;
                let filename = args
                    .filename
                    .as_deref()
                    .unwrap_or(&self.config.report_filename);
                let written = write_review(&root, &args.review, filename)?;
                Ok(ToolOutput::Report {
                    written,
                    review: args.review,
                })
            }
        }
    }
}
