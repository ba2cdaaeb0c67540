use std::fs;
use std::path::Path;

use git2::{IndexAddOption, Repository, Signature};
use revue_core::ReviewConfig;
use revue_mcp::tools::{
    CodeMetricsParams, GenerateCommitMessageParams, GetFileChangesParams, RevueServer,
    WriteReviewParams,
};
use rmcp::{handler::server::wrapper::Parameters, model::*, ServerHandler};

fn extract_text(result: &CallToolResult) -> &str {
    match &result.content[0].raw {
        RawContent::Text(t) => &t.text,
        _ => panic!("expected text content"),
    }
}

fn parse(result: &CallToolResult) -> serde_json::Value {
    serde_json::from_str(extract_text(result)).unwrap()
}

/// A repository with one committed file and an unstaged edit to it.
fn dirty_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    fs::write(dir.path().join("app.js"), "run();\n").unwrap();
    fs::create_dir_all(dir.path().join("dist")).unwrap();
    fs::write(dir.path().join("dist/app.js"), "run();\n").unwrap();

    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("Test", "test@example.com").unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
        .unwrap();

    fs::write(
        dir.path().join("app.js"),
        "run();\nif (debug) { eval(input); }\n",
    )
    .unwrap();
    fs::write(dir.path().join("dist/app.js"), "run();run();\n").unwrap();
    dir
}

fn server(path: &Path) -> RevueServer {
    RevueServer::new(path.to_path_buf(), ReviewConfig::default())
}

#[test]
fn server_info_is_correct() {
    let dir = tempfile::tempdir().unwrap();
    let info = server(dir.path()).get_info();

    assert_eq!(info.server_info.name, "revue");
    assert_eq!(info.server_info.version, env!("CARGO_PKG_VERSION"));
    let instructions = info.instructions.unwrap();
    for tool in [
        "get_file_changes",
        "code_metrics",
        "generate_commit_message",
        "write_review_to_markdown",
    ] {
        assert!(instructions.contains(tool), "missing {tool}");
    }
}

#[test]
fn get_file_changes_skips_excluded_paths() {
    let dir = dirty_repo();
    let result = server(dir.path())
        .get_file_changes(Parameters(GetFileChangesParams { root_dir: None }))
        .unwrap();
    let parsed = parse(&result);
    let files = parsed.as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["file"], "app.js");
    assert!(files[0]["diff"]
        .as_str()
        .unwrap()
        .contains("+if (debug) { eval(input); }"));
}

#[test]
fn get_file_changes_outside_a_repository_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = server(dir.path()).get_file_changes(Parameters(GetFileChangesParams {
        root_dir: Some(".".into()),
    }));
    assert!(result.is_err());
}

#[test]
fn code_metrics_for_working_tree() {
    let dir = dirty_repo();
    let result = server(dir.path())
        .code_metrics(Parameters(CodeMetricsParams {
            root_dir: None,
            diff: None,
        }))
        .unwrap();
    let parsed = parse(&result);
    assert_eq!(parsed["filesChanged"], 1);
    assert_eq!(parsed["linesAdded"], 1);
    assert_eq!(parsed["complexityScore"], 1.5);
    assert_eq!(parsed["securityIssues"][0]["severity"], "high");
    assert_eq!(parsed["skipped"][0], "dist/app.js");
}

#[test]
fn code_metrics_for_supplied_diff() {
    let dir = tempfile::tempdir().unwrap();
    let diff = "\
diff --git a/view.js b/view.js
--- a/view.js
+++ b/view.js
@@ -1 +1,2 @@
 render();
+el.innerHTML = html;
";
    let result = server(dir.path())
        .code_metrics(Parameters(CodeMetricsParams {
            root_dir: None,
            diff: Some(diff.into()),
        }))
        .unwrap();
    let parsed = parse(&result);
    assert_eq!(parsed["filesChanged"], 1);
    assert_eq!(
        parsed["securityIssues"][0]["description"],
        "Potential XSS vulnerability"
    );
    assert_eq!(parsed["securityIssues"][0]["line"], 1);
}

#[test]
fn generate_commit_message_formats_header() {
    let dir = tempfile::tempdir().unwrap();
    let result = server(dir.path())
        .generate_commit_message(Parameters(GenerateCommitMessageParams {
            summary: "drop dead code".into(),
            kind: "refactor".into(),
            scope: None,
        }))
        .unwrap();
    assert_eq!(parse(&result)["commitMessage"], "refactor: drop dead code");
}

#[test]
fn generate_commit_message_rejects_unknown_type() {
    let dir = tempfile::tempdir().unwrap();
    let err = server(dir.path())
        .generate_commit_message(Parameters(GenerateCommitMessageParams {
            summary: "x".into(),
            kind: "feature".into(),
            scope: None,
        }))
        .unwrap_err();
    assert!(err.message.contains("feat, fix"));
}

#[test]
fn write_review_to_markdown_writes_inside_repo() {
    let dir = tempfile::tempdir().unwrap();
    let result = server(dir.path())
        .write_review_to_markdown(Parameters(WriteReviewParams {
            root_dir: None,
            review: "- Nit: rename `x`.".into(),
            filename: None,
        }))
        .unwrap();
    let parsed = parse(&result);
    assert_eq!(parsed["success"], true);
    let content = fs::read_to_string(dir.path().join("code-review.md")).unwrap();
    assert!(content.starts_with("# Code Review - "));
    assert!(content.ends_with("- Nit: rename `x`."));
}

#[test]
fn write_review_to_markdown_rejects_escape() {
    let dir = tempfile::tempdir().unwrap();
    let result = server(dir.path()).write_review_to_markdown(Parameters(WriteReviewParams {
        root_dir: None,
        review: "r".into(),
        filename: Some("../escape.md".into()),
    }));
    assert!(result.is_err());
}
