use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RevueError;

/// Top-level configuration loaded from `.revue.toml`.
///
/// Resolution order: CLI flags > `--config` file > `./.revue.toml` > defaults.
///
/// # Examples
///
/// ```
/// use revue_core::RevueConfig;
///
/// let config = RevueConfig::default();
/// assert_eq!(config.review.exclude, vec!["dist", "bun.lock"]);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevueConfig {
    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Review behavior settings.
    #[serde(default)]
    pub review: ReviewConfig,
}

impl RevueConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RevueError::FileNotFound`] if the file does not exist,
    /// [`RevueError::Io`] if it cannot be read, or [`RevueError::Toml`] if the
    /// content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use revue_core::RevueConfig;
    /// use std::path::Path;
    ///
    /// let config = RevueConfig::from_file(Path::new(".revue.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, RevueError> {
        if !path.exists() {
            return Err(RevueError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`RevueError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use revue_core::RevueConfig;
    ///
    /// let toml = r#"
    /// [review]
    /// max_steps = 4
    /// "#;
    /// let config = RevueConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.review.max_steps, 4);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, RevueError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// LLM provider configuration.
///
/// # Examples
///
/// ```
/// use revue_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.model, "gpt-4o");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name, informational (any OpenAI-compatible endpoint works).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the provider.
    pub api_key: Option<String>,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
}

/// Environment variables consulted, in order, when `api_key` is unset.
pub const API_KEY_ENV_VARS: [&str; 2] = ["REVUE_API_KEY", "OPENAI_API_KEY"];

fn default_provider() -> String {
    "openai".into()
}

fn default_model() -> String {
    "gpt-4o".into()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
        }
    }
}

impl LlmConfig {
    /// The configured API key, falling back to [`API_KEY_ENV_VARS`].
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            API_KEY_ENV_VARS
                .iter()
                .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        })
    }
}

/// What the working tree is compared against.
///
/// Serialized as a plain string: `"index"`, `"head"`, or any other revspec.
///
/// # Examples
///
/// ```
/// use revue_core::Baseline;
///
/// assert_eq!(Baseline::from("head".to_string()), Baseline::Head);
/// assert_eq!(Baseline::from("main".to_string()), Baseline::Rev("main".into()));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Baseline {
    /// Working tree vs index (plain `git diff`).
    #[default]
    Index,
    /// Working tree and index vs `HEAD` (`git diff HEAD`).
    Head,
    /// Working tree vs an arbitrary revision.
    Rev(String),
}

impl From<String> for Baseline {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "" | "index" => Baseline::Index,
            "head" => Baseline::Head,
            _ => Baseline::Rev(value),
        }
    }
}

impl From<Baseline> for String {
    fn from(value: Baseline) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Baseline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Baseline::Index => write!(f, "index"),
            Baseline::Head => write!(f, "head"),
            Baseline::Rev(rev) => write!(f, "{rev}"),
        }
    }
}

/// Review behavior configuration.
///
/// # Examples
///
/// ```
/// use revue_core::{Baseline, ReviewConfig};
///
/// let config = ReviewConfig::default();
/// assert_eq!(config.baseline, Baseline::Index);
/// assert_eq!(config.report_filename, "code-review.md");
/// assert_eq!(config.max_steps, 8);
/// assert!(config.commit_message && config.write_report);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Path literals skipped before any diff is fetched.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    /// Glob patterns skipped before any diff is fetched.
    #[serde(default)]
    pub skip_patterns: Vec<String>,
    /// Comparison baseline for the working tree (default: index).
    #[serde(default)]
    pub baseline: Baseline,
    /// File name for the markdown report, relative to the repository root.
    #[serde(default = "default_report_filename")]
    pub report_filename: String,
    /// Maximum model turns before the review is abandoned (default: 8).
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Offer the commit-message tool to the model.
    #[serde(default = "default_true")]
    pub commit_message: bool,
    /// Offer the markdown-report tool to the model.
    #[serde(default = "default_true")]
    pub write_report: bool,
}

fn default_exclude() -> Vec<String> {
    vec!["dist".into(), "bun.lock".into()]
}

fn default_report_filename() -> String {
    "code-review.md".into()
}

fn default_max_steps() -> usize {
    8
}

fn default_true() -> bool {
    true
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
            skip_patterns: Vec::new(),
            baseline: Baseline::default(),
            report_filename: default_report_filename(),
            max_steps: default_max_steps(),
            commit_message: true,
            write_report: true,
        }
    }
}
