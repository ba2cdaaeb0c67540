//! Excluded-path filtering applied to the change summary before any diff
//! text is fetched.
//!
//! Two kinds of rules are supported: path literals (a literal also excludes
//! everything beneath it, so `dist` skips `dist/app.js`) and glob patterns.

use revue_core::{ChangeSummaryEntry, ReviewConfig};
use tracing::{debug, warn};

/// Paths skipped by default: build output and the lockfile of the bun toolchain.
pub const DEFAULT_EXCLUDES: [&str; 2] = ["dist", "bun.lock"];

/// Deny list of paths that never reach the metrics or the model.
///
/// # Examples
///
/// ```
/// use revue_difflens::filter::PathFilter;
///
/// let filter = PathFilter::default();
/// assert!(filter.is_excluded("bun.lock"));
/// assert!(filter.is_excluded("dist/index.js"));
/// assert!(!filter.is_excluded("src/dist.ts"));
/// ```
#[derive(Debug, Clone)]
pub struct PathFilter {
    literals: Vec<String>,
    patterns: Vec<glob::Pattern>,
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::from_literals(DEFAULT_EXCLUDES)
    }
}

impl PathFilter {
    /// A filter that lets everything through.
    pub fn none() -> Self {
        Self {
            literals: Vec::new(),
            patterns: Vec::new(),
        }
    }

    /// Build a filter from path literals only.
    pub fn from_literals<I, S>(literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            literals: literals
                .into_iter()
                .map(|l| l.into().trim_end_matches('/').to_string())
                .filter(|l| !l.is_empty())
                .collect(),
            patterns: Vec::new(),
        }
    }

    /// Build a filter from review configuration.
    ///
    /// Invalid glob patterns are logged and ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use revue_core::ReviewConfig;
    /// use revue_difflens::filter::PathFilter;
    ///
    /// let config = ReviewConfig {
    ///     skip_patterns: vec!["**/*.snap".into()],
    ///     ..ReviewConfig::default()
    /// };
    /// let filter = PathFilter::from_config(&config);
    /// assert!(filter.is_excluded("tests/__snapshots__/a.snap"));
    /// assert!(filter.is_excluded("dist"));
    /// ```
    pub fn from_config(config: &ReviewConfig) -> Self {
        let mut filter = Self::from_literals(config.exclude.iter().cloned());
        for pat in &config.skip_patterns {
            filter = filter.with_pattern(pat);
        }
        filter
    }

    /// Add one more path literal.
    pub fn with_literal(mut self, literal: impl Into<String>) -> Self {
        let literal = literal.into().trim_end_matches('/').to_string();
        if !literal.is_empty() {
            self.literals.push(literal);
        }
        self
    }

    /// Add one more glob pattern; invalid patterns are skipped with a warning.
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        match glob::Pattern::new(pattern) {
            Ok(p) => self.patterns.push(p),
            Err(e) => warn!(pattern, error = %e, "ignoring invalid skip pattern"),
        }
        self
    }

    /// Why `path` is excluded, if it is.
    pub fn reason(&self, path: &str) -> Option<SkipReason> {
        for literal in &self.literals {
            let under = path
                .strip_prefix(literal.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
            if under {
                return Some(SkipReason::Excluded(literal.clone()));
            }
        }
        self.patterns
            .iter()
            .find(|p| p.matches(path))
            .map(|p| SkipReason::PatternMatch(p.to_string()))
    }

    /// Check if a single path should be skipped.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.reason(path).is_some()
    }

    /// Split a change summary into kept and skipped entries, preserving order.
    ///
    /// # Examples
    ///
    /// ```
    /// use revue_core::ChangeSummaryEntry;
    /// use revue_difflens::filter::PathFilter;
    ///
    /// let entries = vec![
    ///     ChangeSummaryEntry::new("bun.lock", 40, 12),
    ///     ChangeSummaryEntry::new("src/app.ts", 3, 1),
    /// ];
    /// let result = PathFilter::default().apply(entries);
    /// assert_eq!(result.kept.len(), 1);
    /// assert_eq!(result.skipped[0].path, "bun.lock");
    /// ```
    pub fn apply(&self, entries: Vec<ChangeSummaryEntry>) -> FilterResult {
        let mut kept = Vec::with_capacity(entries.len());
        let mut skipped = Vec::new();

        for entry in entries {
            match self.reason(&entry.file_path) {
                Some(reason) => {
                    debug!(path = %entry.file_path, %reason, "skipping file");
                    skipped.push(SkippedFile {
                        path: entry.file_path,
                        reason,
                    });
                }
                None => kept.push(entry),
            }
        }

        FilterResult { kept, skipped }
    }
}

/// Result of filtering a change summary.
#[derive(Debug, Clone)]
pub struct FilterResult {
    /// Entries that passed the filter, in their original order.
    pub kept: Vec<ChangeSummaryEntry>,
    /// Entries that were dropped.
    pub skipped: Vec<SkippedFile>,
}

/// A file that was dropped by the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    /// Path of the skipped file.
    pub path: String,
    /// Which rule dropped it.
    pub reason: SkipReason,
}

/// Which rule excluded a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Matched a path literal.
    Excluded(String),
    /// Matched a glob pattern.
    PatternMatch(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Excluded(literal) => write!(f, "excluded path ({literal})"),
            SkipReason::PatternMatch(pat) => write!(f, "matches pattern ({pat})"),
        }
    }
}
