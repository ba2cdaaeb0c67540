//! Where diffs come from.
//!
//! A [`DiffSource`] answers two questions: which files changed (with line
//! counts), and what the unified diff of one of those files looks like.
//! [`GitDiffSource`] asks a git working tree through libgit2;
//! [`PatchDiffSource`] serves an already-produced patch.

use std::path::{Path, PathBuf};

use git2::{Delta, DiffFormat, DiffOptions, Patch, Repository};
use revue_core::{Baseline, ChangeSummaryEntry, RevueError};
use tracing::debug;

use crate::parser::{split_unified_diff, FilePatch};

/// Produces a per-file change summary and per-file diff text.
pub trait DiffSource {
    /// Every changed file with its insertion and deletion counts, in the
    /// order the backend reports them.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be queried.
    fn summary(&self) -> Result<Vec<ChangeSummaryEntry>, RevueError>;

    /// Unified diff text for one file. A file without changes yields an
    /// empty string.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be queried.
    fn diff(&self, file_path: &str) -> Result<String, RevueError>;
}

/// Diff source backed by a git repository.
///
/// # Examples
///
/// ```no_run
/// use revue_core::Baseline;
/// use revue_difflens::source::{DiffSource, GitDiffSource};
///
/// let source = GitDiffSource::open(".", Baseline::Head).unwrap();
/// for entry in source.summary().unwrap() {
///     println!("{} +{} -{}", entry.file_path, entry.insertions, entry.deletions);
/// }
/// ```
pub struct GitDiffSource {
    repo: Repository,
    baseline: Baseline,
}

impl GitDiffSource {
    /// Open the repository containing `root_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`RevueError::Git`] if no repository is found or it has no
    /// working tree.
    pub fn open(root_dir: impl AsRef<Path>, baseline: Baseline) -> Result<Self, RevueError> {
        let root_dir = root_dir.as_ref();
        let repo = Repository::discover(root_dir).map_err(|e| {
            RevueError::Git(format!(
                "failed to open repository at {}: {e}",
                root_dir.display()
            ))
        })?;
        if repo.is_bare() {
            return Err(RevueError::Git(format!(
                "{} is a bare repository with no working tree",
                root_dir.display()
            )));
        }
        debug!(baseline = %baseline, "opened git diff source");
        Ok(Self { repo, baseline })
    }

    /// Root of the working tree.
    pub fn workdir(&self) -> PathBuf {
        self.repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// The baseline this source compares against.
    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    fn build_diff(&self, pathspec: Option<&str>) -> Result<git2::Diff<'_>, RevueError> {
        let mut opts = DiffOptions::new();
        if let Some(path) = pathspec {
            opts.pathspec(path);
            opts.disable_pathspec_match(true);
        }

        let tree = match &self.baseline {
            Baseline::Index => {
                return self
                    .repo
                    .diff_index_to_workdir(None, Some(&mut opts))
                    .map_err(|e| RevueError::Git(format!("failed to compute diff: {e}")));
            }
            Baseline::Head => match self.repo.head() {
                Ok(head) => Some(
                    head.peel_to_tree()
                        .map_err(|e| RevueError::Git(format!("failed to read HEAD tree: {e}")))?,
                ),
                // Unborn branch: everything in the index is new.
                Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
                Err(e) => return Err(RevueError::Git(format!("failed to resolve HEAD: {e}"))),
            },
            Baseline::Rev(rev) => Some(
                self.repo
                    .revparse_single(rev)
                    .and_then(|obj| obj.peel_to_tree())
                    .map_err(|e| RevueError::Git(format!("failed to resolve '{rev}': {e}")))?,
            ),
        };

        self.repo
            .diff_tree_to_workdir_with_index(tree.as_ref(), Some(&mut opts))
            .map_err(|e| RevueError::Git(format!("failed to compute diff: {e}")))
    }
}

impl DiffSource for GitDiffSource {
    fn summary(&self) -> Result<Vec<ChangeSummaryEntry>, RevueError> {
        let diff = self.build_diff(None)?;
        let mut entries = Vec::with_capacity(diff.deltas().len());

        for idx in 0..diff.deltas().len() {
            let patch = Patch::from_diff(&diff, idx)
                .map_err(|e| RevueError::Git(format!("failed to load patch: {e}")))?;
            let Some(delta) = diff.get_delta(idx) else {
                continue;
            };
            if delta.status() == Delta::Unmodified {
                continue;
            }

            let file = if delta.status() == Delta::Deleted {
                delta.old_file()
            } else {
                delta.new_file()
            };
            let Some(path) = file.path() else {
                continue;
            };
            let file_path = path.to_string_lossy().into_owned();

            let entry = match patch {
                Some(patch) if !patch.delta().flags().is_binary() => {
                    let (_, insertions, deletions) = patch
                        .line_stats()
                        .map_err(|e| RevueError::Git(format!("failed to count lines: {e}")))?;
                    ChangeSummaryEntry::new(file_path, insertions as u64, deletions as u64)
                }
                _ => ChangeSummaryEntry {
                    binary: true,
                    ..ChangeSummaryEntry::new(file_path, 0, 0)
                },
            };
            entries.push(entry);
        }

        Ok(entries)
    }

    fn diff(&self, file_path: &str) -> Result<String, RevueError> {
        let diff = self.build_diff(Some(file_path))?;
        let mut out = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            if matches!(line.origin(), '+' | '-' | ' ') {
                out.push(line.origin());
            }
            out.push_str(&String::from_utf8_lossy(line.content()));
            true
        })
        .map_err(|e| RevueError::Git(format!("failed to render diff for {file_path}: {e}")))?;
        Ok(out)
    }
}

/// Diff source backed by an existing unified diff, e.g. a `.patch` file or
/// the output of `git diff` piped on stdin.
///
/// A path touched more than once (say, a concatenated `git log -p`) is
/// reported once: counts are summed and its diff is every patch in order.
///
/// # Examples
///
/// ```
/// use revue_difflens::source::{DiffSource, PatchDiffSource};
///
/// let patch = "diff --git a/a.ts b/a.ts\n\
///              --- a/a.ts\n\
///              +++ b/a.ts\n\
///              @@ -1 +1 @@\n\
///              -let x = 1;\n\
///              +let x = 2;\n";
/// let source = PatchDiffSource::parse(patch).unwrap();
/// let summary = source.summary().unwrap();
/// assert_eq!(summary[0].file_path, "a.ts");
/// assert_eq!((summary[0].insertions, summary[0].deletions), (1, 1));
/// assert!(source.diff("a.ts").unwrap().contains("+let x = 2;"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PatchDiffSource {
    files: Vec<FilePatch>,
}

impl PatchDiffSource {
    /// Split `patch` into files.
    ///
    /// # Errors
    ///
    /// Returns [`RevueError::Parse`] if a hunk header is malformed.
    pub fn parse(patch: &str) -> Result<Self, RevueError> {
        Ok(Self::from(split_unified_diff(patch)?))
    }

    /// Read and split a patch file.
    ///
    /// # Errors
    ///
    /// Returns [`RevueError::FileNotFound`] if `path` does not exist, or
    /// any error from [`PatchDiffSource::parse`].
    pub fn from_file(path: &Path) -> Result<Self, RevueError> {
        if !path.exists() {
            return Err(RevueError::FileNotFound(path.to_path_buf()));
        }
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// The files in this patch.
    pub fn files(&self) -> &[FilePatch] {
        &self.files
    }
}

impl From<Vec<FilePatch>> for PatchDiffSource {
    fn from(patches: Vec<FilePatch>) -> Self {
        let mut files: Vec<FilePatch> = Vec::with_capacity(patches.len());
        for patch in patches {
            match files.iter_mut().find(|f| f.path() == patch.path()) {
                Some(file) => {
                    file.text.push_str(&patch.text);
                    file.insertions += patch.insertions;
                    file.deletions += patch.deletions;
                    file.hunks += patch.hunks;
                    file.is_binary |= patch.is_binary;
                }
                None => files.push(patch),
            }
        }
        Self { files }
    }
}

impl DiffSource for PatchDiffSource {
    fn summary(&self) -> Result<Vec<ChangeSummaryEntry>, RevueError> {
        Ok(self
            .files
            .iter()
            .map(|f| ChangeSummaryEntry {
                binary: f.is_binary,
                ..ChangeSummaryEntry::new(f.path(), f.insertions, f.deletions)
            })
            .collect())
    }

    fn diff(&self, file_path: &str) -> Result<String, RevueError> {
        self.files
            .iter()
            .find(|f| f.path() == file_path)
            .map(|f| f.text.clone())
            .ok_or_else(|| RevueError::FileNotFound(PathBuf::from(file_path)))
    }
}
