//! Tool implementations for the revue MCP server.
//!
//! Each tool delegates to `revue-review` or `revue-difflens` and returns
//! pretty-printed JSON via `CallToolResult`.

use std::path::PathBuf;

use revue_core::{CommitType, ReviewConfig};
use revue_difflens::filter::PathFilter;
use revue_difflens::metrics::analyze;
use revue_difflens::source::PatchDiffSource;
use revue_review::tools::{
    code_metrics, commit_message, get_file_changes, resolve_root, write_review,
};
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars, tool, tool_router, ErrorData as McpError,
};
use serde::{Deserialize, Serialize};

/// MCP server exposing the review tools for one repository.
///
/// # Examples
///
/// ```
/// use revue_core::ReviewConfig;
/// use revue_mcp::tools::RevueServer;
/// use std::path::PathBuf;
///
/// let server = RevueServer::new(PathBuf::from("."), ReviewConfig::default());
/// ```
#[derive(Clone)]
pub struct RevueServer {
    pub(crate) repo_path: PathBuf,
    pub(crate) config: ReviewConfig,
    pub(crate) tool_router: ToolRouter<Self>,
}

/// Parameters for the `get_file_changes` tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetFileChangesParams {
    /// Directory inside the repository (default: the server's repository).
    pub root_dir: Option<String>,
}

/// Parameters for the `generate_commit_message` tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GenerateCommitMessageParams {
    /// A summary of the changes made.
    pub summary: String,
    /// One of feat, fix, docs, style, refactor, perf, test, chore.
    #[serde(rename = "type")]
    pub kind: String,
    /// Optional scope, e.g. "parser".
    pub scope: Option<String>,
}

/// Parameters for the `write_review_to_markdown` tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct WriteReviewParams {
    /// Directory the report is written to (default: the server's repository).
    pub root_dir: Option<String>,
    /// The complete review in markdown.
    pub review: String,
    /// File name relative to root_dir (default: the configured report file).
    pub filename: Option<String>,
}

/// Parameters for the `code_metrics` tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CodeMetricsParams {
    /// Directory inside the repository (default: the server's repository).
    pub root_dir: Option<String>,
    /// Unified diff to measure instead of the working tree.
    pub diff: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CommitMessageResponse {
    commit_message: String,
}

fn mcp_err(msg: impl Into<String>) -> McpError {
    McpError::internal_error(msg.into(), None)
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| mcp_err(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[tool_router]
impl RevueServer {
    /// Create a new server for the repository at `repo_path`.
    pub fn new(repo_path: PathBuf, config: ReviewConfig) -> Self {
        Self {
            repo_path,
            config,
            tool_router: Self::tool_router(),
        }
    }

    fn resolve_path(&self, path: &Option<String>) -> Result<PathBuf, McpError> {
        resolve_root(&self.repo_path, path.as_deref().unwrap_or(".")).map_err(|e| {
            mcp_err(format!(
                "{e} (configured repository: {})",
                self.repo_path.display()
            ))
        })
    }

    #[tool(
        name = "get_file_changes",
        description = "Get the uncommitted changes of the repository as a list of { file, diff } objects, one per changed file. Build output and lockfiles configured as excluded are skipped. Call this first when reviewing."
    )]
    pub fn get_file_changes(
        &self,
        Parameters(params): Parameters<GetFileChangesParams>,
    ) -> Result<CallToolResult, McpError> {
        let root = self.resolve_path(&params.root_dir)?;
        let changes = get_file_changes(&root, &self.config)
            .map_err(|e| mcp_err(format!("Failed to collect changes: {e}")))?;
        json_result(&changes)
    }

    #[tool(
        name = "generate_commit_message",
        description = "Format a conventional commit message header: type(scope): summary. Use after reviewing to suggest a commit message for the changes."
    )]
    pub fn generate_commit_message(
        &self,
        Parameters(params): Parameters<GenerateCommitMessageParams>,
    ) -> Result<CallToolResult, McpError> {
        if params.summary.trim().is_empty() {
            return Err(McpError::invalid_params("summary must not be empty", None));
        }
        let kind: CommitType = params.kind.parse().map_err(|e: String| {
            McpError::invalid_params(
                format!("{e}; expected one of feat, fix, docs, style, refactor, perf, test, chore"),
                None,
            )
        })?;
        json_result(&CommitMessageResponse {
            commit_message: commit_message(kind, params.scope.as_deref(), params.summary.trim()),
        })
    }

    #[tool(
        name = "write_review_to_markdown",
        description = "Save a finished code review as a markdown file titled with today's date. The filename must be relative and stay inside the repository."
    )]
    pub fn write_review_to_markdown(
        &self,
        Parameters(params): Parameters<WriteReviewParams>,
    ) -> Result<CallToolResult, McpError> {
        let root = self.resolve_path(&params.root_dir)?;
        let filename = params
            .filename
            .as_deref()
            .unwrap_or(&self.config.report_filename);
        let written = write_review(&root, &params.review, filename)
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
        json_result(&written)
    }

    #[tool(
        name = "code_metrics",
        description = "Compute lines added/removed, a heuristic complexity score and naive security indicators for the working tree, or for a unified diff if one is given. Indicators are pattern matches, not verified vulnerabilities."
    )]
    pub fn code_metrics(
        &self,
        Parameters(params): Parameters<CodeMetricsParams>,
    ) -> Result<CallToolResult, McpError> {
        let report = match params.diff {
            Some(diff) => {
                let source = PatchDiffSource::parse(&diff).map_err(|e| {
                    mcp_err(format!(
                        "Failed to parse diff: {e}. Ensure input is valid unified diff format (git diff output)."
                    ))
                })?;
                analyze(&source, &PathFilter::from_config(&self.config))
                    .map_err(|e| mcp_err(e.to_string()))?
            }
            None => {
                let root = self.resolve_path(&params.root_dir)?;
                code_metrics(&root, &self.config)
                    .map_err(|e| mcp_err(format!("Failed to compute metrics: {e}")))?
            }
        };
        json_result(&report)
    }
}
