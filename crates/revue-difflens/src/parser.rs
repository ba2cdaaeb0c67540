//! Splitting a unified diff into per-file patches.
//!
//! Only enough structure is read to find file boundaries and count `+`/`-`
//! lines; each file keeps its raw text for the scanners.

use std::fmt;
use std::path::PathBuf;

use revue_core::RevueError;

/// The slice of a multi-file unified diff that belongs to one file.
///
/// # Examples
///
/// ```
/// use revue_difflens::parser::split_unified_diff;
///
/// let diff = "diff --git a/hello.ts b/hello.ts\n\
///             --- a/hello.ts\n\
///             +++ b/hello.ts\n\
///             @@ -1,2 +1,3 @@\n\
///              function main() {\n\
///             +  console.log(\"hello\");\n\
///              }\n";
/// let files = split_unified_diff(diff).unwrap();
/// assert_eq!(files.len(), 1);
/// assert_eq!(files[0].path(), "hello.ts");
/// assert_eq!(files[0].insertions, 1);
/// ```
#[derive(Debug, Clone)]
pub struct FilePatch {
    /// Path in the old version.
    pub old_path: PathBuf,
    /// Path in the new version.
    pub new_path: PathBuf,
    /// Raw diff lines for this file, headers included.
    pub text: String,
    /// `+` lines inside hunks.
    pub insertions: u64,
    /// `-` lines inside hunks.
    pub deletions: u64,
    /// Whether this is a newly created file.
    pub is_new_file: bool,
    /// Whether this file was deleted.
    pub is_deleted_file: bool,
    /// Whether this file was renamed.
    pub is_rename: bool,
    /// Whether git reported the file as binary.
    pub is_binary: bool,
    /// Number of hunks seen.
    pub hunks: usize,
}

impl FilePatch {
    fn empty() -> Self {
        Self {
            old_path: PathBuf::new(),
            new_path: PathBuf::new(),
            text: String::new(),
            insertions: 0,
            deletions: 0,
            is_new_file: false,
            is_deleted_file: false,
            is_rename: false,
            is_binary: false,
            hunks: 0,
        }
    }

    /// The path this change is reported under: the new path, or the old
    /// one for deletions.
    pub fn path(&self) -> String {
        let path = if self.is_deleted_file || self.new_path.as_os_str().is_empty() {
            &self.old_path
        } else {
            &self.new_path
        };
        path.to_string_lossy().into_owned()
    }

    fn push_line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }
}

impl fmt::Display for FilePatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (+{}/-{})", self.path(), self.insertions, self.deletions)
    }
}

/// Remaining line budget of the hunk being read.
#[derive(Default)]
struct HunkCursor {
    old_left: u32,
    new_left: u32,
}

impl HunkCursor {
    fn is_open(&self) -> bool {
        self.old_left > 0 || self.new_left > 0
    }
}

/// Split a unified diff (as produced by `git diff`) into one [`FilePatch`]
/// per file, keeping each file's raw text.
///
/// Hunk headers are used to know where content ends, so removed lines that
/// happen to begin with `--- ` are not mistaken for a new file header.
/// Binary files are kept with zero line counts.
///
/// # Errors
///
/// Returns [`RevueError::Parse`] if a hunk header is malformed.
///
/// # Examples
///
/// ```
/// use revue_difflens::parser::split_unified_diff;
///
/// assert!(split_unified_diff("").unwrap().is_empty());
/// ```
pub fn split_unified_diff(input: &str) -> Result<Vec<FilePatch>, RevueError> {
    let mut files: Vec<FilePatch> = Vec::new();
    let mut current: Option<FilePatch> = None;
    let mut hunk = HunkCursor::default();
    let mut lines = input.lines().peekable();

    while let Some(line) = lines.next() {
        if hunk.is_open() && !line.starts_with("diff --git ") {
            if let Some(file) = current.as_mut() {
                file.push_line(line);
                match line.chars().next() {
                    Some('+') => {
                        file.insertions += 1;
                        hunk.new_left = hunk.new_left.saturating_sub(1);
                    }
                    Some('-') => {
                        file.deletions += 1;
                        hunk.old_left = hunk.old_left.saturating_sub(1);
                    }
                    Some('\\') => {}
                    _ => {
                        hunk.old_left = hunk.old_left.saturating_sub(1);
                        hunk.new_left = hunk.new_left.saturating_sub(1);
                    }
                }
            }
            continue;
        }
        hunk = HunkCursor::default();

        let starts_file = line.starts_with("diff --git ")
            || (line.starts_with("--- ")
                && lines.peek().is_some_and(|next| next.starts_with("+++ "))
                && current.as_ref().map_or(true, |f| f.hunks > 0));

        if starts_file {
            if let Some(file) = current.take() {
                files.push(file);
            }
            current = Some(FilePatch::empty());
        }

        let Some(file) = current.as_mut() else {
            continue;
        };
        file.push_line(line);

        if line.starts_with("Binary files ") && line.ends_with(" differ") {
            file.is_binary = true;
        } else if line.starts_with("new file mode") {
            file.is_new_file = true;
        } else if line.starts_with("deleted file mode") {
            file.is_deleted_file = true;
        } else if let Some(from) = line.strip_prefix("rename from ") {
            file.is_rename = true;
            file.old_path = PathBuf::from(from);
        } else if let Some(to) = line.strip_prefix("rename to ") {
            file.is_rename = true;
            file.new_path = PathBuf::from(to);
        } else if let Some(path) = line.strip_prefix("--- ") {
            file.old_path = parse_path(path);
            if path == "/dev/null" {
                file.is_new_file = true;
            }
        } else if let Some(path) = line.strip_prefix("+++ ") {
            file.new_path = parse_path(path);
            if path == "/dev/null" {
                file.is_deleted_file = true;
            }
        } else if line.starts_with("@@ ") {
            let (_, old_lines, _, new_lines) = parse_hunk_header(line)?;
            file.hunks += 1;
            hunk = HunkCursor {
                old_left: old_lines,
                new_left: new_lines,
            };
        } else if let Some(rest) = line.strip_prefix("diff --git ") {
            if let Some((old, new)) = rest.split_once(" b/") {
                file.old_path = parse_path(old);
                file.new_path = PathBuf::from(new);
            }
        }
    }

    if let Some(file) = current.take() {
        files.push(file);
    }

    Ok(files)
}

fn parse_path(raw: &str) -> PathBuf {
    let normalized = raw.trim_matches('"');

    if normalized == "/dev/null" {
        return PathBuf::from("/dev/null");
    }

    let stripped = normalized
        .strip_prefix("a/")
        .or_else(|| normalized.strip_prefix("b/"))
        .unwrap_or(normalized);

    PathBuf::from(stripped)
}

fn parse_hunk_header(line: &str) -> Result<(u32, u32, u32, u32), RevueError> {
    let inner = line
        .strip_prefix("@@ ")
        .and_then(|s| {
            let end = s.find(" @@")?;
            Some(&s[..end])
        })
        .ok_or_else(|| RevueError::Parse(format!("invalid hunk header: {line}")))?;

    let Some((old, new)) = inner.split_once(' ') else {
        return Err(RevueError::Parse(format!("invalid hunk header: {line}")));
    };

    let old = old
        .strip_prefix('-')
        .ok_or_else(|| RevueError::Parse(format!("invalid old range in hunk: {line}")))?;
    let new = new
        .strip_prefix('+')
        .ok_or_else(|| RevueError::Parse(format!("invalid new range in hunk: {line}")))?;

    let (old_start, old_lines) = parse_range(old, line)?;
    let (new_start, new_lines) = parse_range(new, line)?;

    Ok((old_start, old_lines, new_start, new_lines))
}

fn parse_range(range: &str, context: &str) -> Result<(u32, u32), RevueError> {
    let invalid = || RevueError::Parse(format!("invalid range in: {context}"));
    match range.split_once(',') {
        Some((start, count)) => Ok((
            start.parse().map_err(|_| invalid())?,
            count.parse().map_err(|_| invalid())?,
        )),
        None => Ok((range.parse().map_err(|_| invalid())?, 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_file_keeps_raw_text() {
        let diff = "\
diff --git a/src/main.ts b/src/main.ts
index abc1234..def5678 100644
--- a/src/main.ts
+++ b/src/main.ts
@@ -1,3 +1,4 @@
 function main() {
+  if (ready) { go(); }
   let x = 1;
 }
";
        let files = split_unified_diff(diff).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path(), "src/main.ts");
        assert_eq!(files[0].insertions, 1);
        assert_eq!(files[0].deletions, 0);
        assert_eq!(files[0].text, diff);
    }

    #[test]
    fn multiple_files_are_split_in_order() {
        let diff = "\
diff --git a/a.js b/a.js
--- a/a.js
+++ b/a.js
@@ -1 +1,2 @@
 line1
+line2
diff --git a/b.js b/b.js
--- a/b.js
+++ b/b.js
@@ -1,2 +1 @@
 line1
-line2
";
        let files = split_unified_diff(diff).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path(), "a.js");
        assert_eq!((files[0].insertions, files[0].deletions), (1, 0));
        assert_eq!(files[1].path(), "b.js");
        assert_eq!((files[1].insertions, files[1].deletions), (0, 1));
        assert!(files[1].text.starts_with("diff --git a/b.js"));
        assert!(!files[0].text.contains("b.js"));
    }

    #[test]
    fn removed_line_that_looks_like_a_header_stays_in_hunk() {
        let diff = "\
--- a/notes.md
+++ b/notes.md
@@ -1,2 +1,2 @@
 title
--- separator
+++ banner
";
        let files = split_unified_diff(diff).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].deletions, 1);
        assert_eq!(files[0].insertions, 1);
    }

    #[test]
    fn headerless_patches_split_on_file_markers() {
        let diff = "\
--- a/one.py
+++ b/one.py
@@ -1 +1 @@
-old
+new
--- a/two.py
+++ b/two.py
@@ -1 +1 @@
-old
+new
";
        let files = split_unified_diff(diff).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].path(), "two.py");
    }

    #[test]
    fn deleted_file_reports_old_path() {
        let diff = "\
diff --git a/old.ts b/old.ts
deleted file mode 100644
--- a/old.ts
+++ /dev/null
@@ -1,2 +0,0 @@
-const a = 1;
-const b = 2;
";
        let files = split_unified_diff(diff).unwrap();
        assert!(files[0].is_deleted_file);
        assert_eq!(files[0].path(), "old.ts");
        assert_eq!(files[0].deletions, 2);
    }

    #[test]
    fn new_file_is_flagged() {
        let diff = "\
diff --git a/new.ts b/new.ts
new file mode 100644
--- /dev/null
+++ b/new.ts
@@ -0,0 +1,2 @@
+export const a = 1;
+export const b = 2;
";
        let files = split_unified_diff(diff).unwrap();
        assert!(files[0].is_new_file);
        assert_eq!(files[0].path(), "new.ts");
        assert_eq!(files[0].insertions, 2);
    }

    #[test]
    fn binary_files_are_kept_without_counts() {
        let diff = "\
diff --git a/logo.png b/logo.png
Binary files a/logo.png and b/logo.png differ
diff --git a/code.rs b/code.rs
--- a/code.rs
+++ b/code.rs
@@ -1 +1,2 @@
 line1
+line2
";
        let files = split_unified_diff(diff).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].is_binary);
        assert_eq!(files[0].path(), "logo.png");
        assert_eq!((files[0].insertions, files[0].deletions), (0, 0));
        assert!(!files[1].is_binary);
    }

    #[test]
    fn pure_rename_uses_rename_paths() {
        let diff = "\
diff --git a/old_name.rs b/new_name.rs
similarity index 100%
rename from old_name.rs
rename to new_name.rs
";
        let files = split_unified_diff(diff).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].is_rename);
        assert_eq!(files[0].path(), "new_name.rs");
    }

    #[test]
    fn no_newline_marker_is_not_counted() {
        let diff = "\
diff --git a/f.rs b/f.rs
--- a/f.rs
+++ b/f.rs
@@ -1 +1 @@
-old
\\ No newline at end of file
+new
\\ No newline at end of file
";
        let files = split_unified_diff(diff).unwrap();
        assert_eq!((files[0].insertions, files[0].deletions), (1, 1));
        assert!(files[0].text.contains("No newline"));
    }

    #[test]
    fn quoted_paths_are_unquoted() {
        assert_eq!(parse_path("\"a/src/my file.rs\""), PathBuf::from("src/my file.rs"));
        assert_eq!(parse_path("b/src/lib.rs"), PathBuf::from("src/lib.rs"));
        assert_eq!(parse_path("/dev/null"), PathBuf::from("/dev/null"));
    }

    #[test]
    fn malformed_hunk_header_is_an_error() {
        let diff = "\
--- a/x
+++ b/x
@@ -a,b +1 @@
";
        assert!(matches!(
            split_unified_diff(diff),
            Err(RevueError::Parse(_))
        ));
    }
}
