//! Diff collection and lexical metrics.
//!
//! Collects per-file diffs from a git working tree (via git2) or an existing
//! patch, drops excluded paths, then scores every file for textual complexity
//! and naive security indicators before folding the results into one
//! [`revue_core::CodeMetricsResult`].

pub mod complexity;
pub mod filter;
pub mod metrics;
pub mod parser;
pub mod security;
pub mod source;
