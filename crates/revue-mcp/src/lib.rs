//! MCP server exposing the revue tools to IDEs and agents.
//!
//! Implements a Model Context Protocol server using rmcp that exposes
//! `get_file_changes`, `generate_commit_message`, `write_review_to_markdown`
//! and `code_metrics` over stdio, so an editor's own model can drive the
//! review instead of revue's built-in orchestrator.
//!
//! # Examples
//!
//! ```no_run
//! use std::path::PathBuf;
//! use revue_core::ReviewConfig;
//!
//! # async fn example() -> Result<(), revue_core::RevueError> {
//! revue_mcp::server::run_server(PathBuf::from("."), ReviewConfig::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod server;
pub mod tools;
