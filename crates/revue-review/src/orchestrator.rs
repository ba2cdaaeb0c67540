use std::path::{Path, PathBuf};

use revue_core::{CodeMetricsResult, ReviewConfig, RevueError};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::llm::{ChatMessage, ChatModel};
use crate::prompt;
use crate::tools::{code_metrics, ReviewTools, ToolOutput};

/// What a finished review produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    /// Final review text.
    pub review: String,
    /// Commit message suggested through the commit-message tool, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    /// Report written through the markdown tool, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
    /// Number of tool calls the model made.
    pub tool_calls: usize,
    /// Lexical metrics given to the model as context.
    pub metrics: CodeMetricsResult,
}

impl ReviewOutcome {
    /// Render the outcome as a markdown string.
    ///
    /// # Examples
    ///
    /// ```
    /// use revue_core::CodeMetricsResult;
    /// use revue_review::orchestrator::ReviewOutcome;
    ///
    /// let outcome = ReviewOutcome {
    ///     review: "Looks good.".into(),
    ///     commit_message: Some("chore: tidy".into()),
    ///     report_path: None,
    ///     tool_calls: 2,
    ///     metrics: CodeMetricsResult::default(),
    /// };
    /// let md = outcome.to_markdown();
    /// assert!(md.contains("Looks good."));
    /// assert!(md.contains("`chore: tidy`"));
    /// ```
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.review);
        out.push('\n');
        if let Some(message) = &self.commit_message {
            out.push_str(&format!("\n**Suggested commit:** `{message}`\n"));
        }
        if let Some(path) = &self.report_path {
            out.push_str(&format!("\n_Report written to {}_\n", path.display()));
        }
        out
    }
}

impl std::fmt::Display for ReviewOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.review)?;
        if let Some(message) = &self.commit_message {
            writeln!(f, "\nSuggested commit: {message}")?;
        }
        if let Some(path) = &self.report_path {
            writeln!(f, "Report written to {}", path.display())?;
        }
        Ok(())
    }
}

/// Drives a tool-calling conversation until the model stops asking for
/// tools.
pub struct ReviewOrchestrator<M> {
    model: M,
    tools: ReviewTools,
    max_steps: usize,
}

impl<M: ChatModel> ReviewOrchestrator<M> {
    /// Review the working tree at `root_dir` with `model`.
    pub fn new(model: M, root_dir: impl Into<PathBuf>, config: ReviewConfig) -> Self {
        let max_steps = config.max_steps;
        Self {
            model,
            tools: ReviewTools::new(root_dir, config),
            max_steps,
        }
    }

    /// Repository under review.
    pub fn root_dir(&self) -> &Path {
        self.tools.base()
    }

    /// Compute the metrics for the repository, then run the conversation.
    ///
    /// # Errors
    ///
    /// Returns [`RevueError::Git`] if the repository cannot be read, any
    /// model error, or [`RevueError::Llm`] when the model is still calling
    /// tools after `max_steps` turns.
    pub async fn run(&self) -> Result<ReviewOutcome, RevueError> {
        let metrics = code_metrics(self.tools.base(), self.tools.config())?.metrics;
        self.run_with_metrics(metrics).await
    }

    /// Run the conversation with metrics computed elsewhere.
    ///
    /// # Errors
    ///
    /// Same as [`ReviewOrchestrator::run`], minus the metrics step.
    pub async fn run_with_metrics(
        &self,
        metrics: CodeMetricsResult,
    ) -> Result<ReviewOutcome, RevueError> {
        let specs = self.tools.specs();
        let mut messages = vec![
            ChatMessage::system(prompt::build_system_prompt(self.tools.enabled())),
            ChatMessage::user(prompt::build_review_prompt(self.tools.base(), &metrics)),
        ];

        let mut tool_calls = 0;
        let mut commit_message = None;
        let mut report: Option<(PathBuf, String)> = None;

        for step in 1..=self.max_steps {
            let turn = self.model.complete(&messages, &specs).await?;
            debug!(step, tool_calls = turn.tool_calls.len(), "model turn");

            if turn.tool_calls.is_empty() {
                let text = turn.content.unwrap_or_default();
                let review = match report {
                    Some((_, ref written)) if text.trim().is_empty() => written.clone(),
                    _ => text,
                };
                return Ok(ReviewOutcome {
                    review,
                    commit_message,
                    report_path: report.map(|(path, _)| path),
                    tool_calls,
                    metrics,
                });
            }

            messages.push(ChatMessage::assistant(&turn));
            for call in &turn.tool_calls {
                tool_calls += 1;
                info!(tool = %call.function.name, "executing tool");
                let content = match self
                    .tools
                    .execute(&call.function.name, &call.function.arguments)
                {
                    Ok(output) => {
                        let json = output.to_json();
                        match output {
                            ToolOutput::CommitMessage(message) => commit_message = Some(message),
                            ToolOutput::Report { written, review } => {
                                report = Some((written.file_path, review));
                            }
                            ToolOutput::FileChanges(_) => {}
                        }
                        json.to_string()
                    }
                    Err(e) => {
                        warn!(tool = %call.function.name, error = %e, "tool call failed");
                        serde_json::json!({ "error": e.to_string() }).to_string()
                    }
                };
                messages.push(ChatMessage::tool(call.id.clone(), content));
            }
        }

        Err(RevueError::Llm(format!(
            "model did not finish the review within {} steps",
            self.max_steps
        )))
    }
}
