use std::path::PathBuf;

/// Errors that can occur anywhere in revue.
///
/// Library crates return this type directly; the binary crate reports it
/// through `miette` at the boundary.
///
/// # Examples
///
/// ```
/// use revue_core::RevueError;
///
/// let err = RevueError::Git("not a repository".into());
/// assert!(err.to_string().contains("not a repository"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum RevueError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The version-control backend could not produce a summary or diff.
    #[error("git error: {0}")]
    #[diagnostic(help("run revue inside a git working tree, or pass --path to one"))]
    Git(String),

    /// Unified diff text could not be split into files.
    #[error("parse error: {0}")]
    Parse(String),

    /// LLM API or response error.
    #[error("LLM error: {0}")]
    Llm(String),

    /// A review tool was called with bad arguments or could not run.
    #[error("tool error: {0}")]
    Tool(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}
