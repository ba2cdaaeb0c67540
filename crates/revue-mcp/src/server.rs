//! MCP server setup and lifecycle.

use std::path::PathBuf;

use revue_core::{ReviewConfig, RevueError};
use rmcp::{model::*, tool_handler, transport::stdio, ServerHandler, ServiceExt};
use tracing::info;

use crate::tools::RevueServer;

const SERVER_INSTRUCTIONS: &str = "\
Revue reviews uncommitted changes in a git working tree. Typical flow:\n\
- get_file_changes: per-file diffs of the working tree (excluded paths skipped)\n\
- code_metrics: heuristic complexity score and naive security indicators\n\
- generate_commit_message: format a conventional commit header\n\
- write_review_to_markdown: save the finished review as a dated markdown file";

#[tool_handler]
impl ServerHandler for RevueServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "revue".to_string(),
                title: Some("Revue Code Review".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: Some("Working-tree code review tools and diff metrics".to_string()),
                icons: None,
                website_url: None,
            },
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
        }
    }
}

/// Start the MCP server on stdio transport and block until the client
/// closes stdin.
///
/// # Errors
///
/// Returns [`RevueError::Config`] if the server fails to initialize or hits
/// a transport error.
pub async fn run_server(repo_path: PathBuf, config: ReviewConfig) -> Result<(), RevueError> {
    info!(repo = %repo_path.display(), "starting MCP server");
    let server = RevueServer::new(repo_path, config);
    let service = server
        .serve(stdio())
        .await
        .map_err(|e| RevueError::Config(format!("MCP server failed to start: {e}")))?;

    service
        .waiting()
        .await
        .map_err(|e| RevueError::Config(format!("MCP server error: {e}")))?;

    Ok(())
}
