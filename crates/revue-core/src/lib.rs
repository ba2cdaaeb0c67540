//! Core types, configuration, and error handling for revue.
//!
//! This crate provides the shared foundation used by all other revue crates:
//! - [`RevueError`]: unified error type using `thiserror` and `miette`
//! - [`RevueConfig`]: configuration loaded from `.revue.toml`
//! - Shared types: [`ChangeSummaryEntry`], [`SecurityIssue`], [`Severity`],
//!   [`CodeMetricsResult`], [`CommitType`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{Baseline, LlmConfig, ReviewConfig, RevueConfig, API_KEY_ENV_VARS};
pub use error::RevueError;
pub use types::{
    ChangeSummaryEntry, CodeMetricsResult, CommitType, OutputFormat, SecurityIssue, Severity,
};

/// A convenience `Result` type for revue operations.
pub type Result<T> = std::result::Result<T, RevueError>;
