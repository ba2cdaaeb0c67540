use std::fs;
use std::path::Path;

use git2::{IndexAddOption, Repository, Signature};
use revue_core::{Baseline, Severity};
use revue_difflens::filter::PathFilter;
use revue_difflens::metrics::analyze;
use revue_difflens::source::{DiffSource, GitDiffSource};

fn commit_all(repo: &Repository) {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("Test", "test@example.com").unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
        .unwrap();
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn working_tree_changes_are_measured_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    write(dir.path(), "src/auth.js", "module.exports = {};\n");
    write(dir.path(), "src/loop.js", "let n = 0;\n");
    write(dir.path(), "dist/app.js", "x\n");
    write(dir.path(), "bun.lock", "{}\n");
    commit_all(&repo);

    write(
        dir.path(),
        "src/auth.js",
        "const password = \"hunter2\";\nmodule.exports = {};\n",
    );
    write(
        dir.path(),
        "src/loop.js",
        "let n = 0;\nwhile (n < 3) {\n  n++;\n}\n",
    );
    write(dir.path(), "dist/app.js", "eval(x)\n");
    write(dir.path(), "bun.lock", "{\"a\":1}\n");

    let source = GitDiffSource::open(dir.path(), Baseline::Index).unwrap();
    assert_eq!(source.summary().unwrap().len(), 4);

    let report = analyze(&source, &PathFilter::default()).unwrap();
    let m = &report.metrics;
    assert_eq!(m.files_changed, 2);
    assert_eq!(m.lines_added, 4);
    assert_eq!(m.lines_removed, 0);
    // auth.js scores 1.0, loop.js scores 2.0
    assert_eq!(m.complexity_score, 1.5);
    assert_eq!(m.security_issues.len(), 1);
    assert_eq!(m.security_issues[0].file, "src/auth.js");
    assert_eq!(m.security_issues[0].severity, Severity::High);

    let mut skipped = report.skipped.clone();
    skipped.sort();
    assert_eq!(skipped, vec!["bun.lock", "dist/app.js"]);
}

#[test]
fn discovers_repository_from_subdirectory() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    write(dir.path(), "pkg/lib.ts", "export const a = 1;\n");
    commit_all(&repo);
    write(dir.path(), "pkg/lib.ts", "export const a = 2;\n");

    let source = GitDiffSource::open(dir.path().join("pkg"), Baseline::Index).unwrap();
    let summary = source.summary().unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].file_path, "pkg/lib.ts");
    assert_eq!(
        source.workdir().canonicalize().unwrap(),
        dir.path().canonicalize().unwrap()
    );
}
