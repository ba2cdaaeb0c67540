use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_revue"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "revue init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config_path = dir.path().join(".revue.toml");
    assert!(config_path.exists(), ".revue.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[llm]"));
    assert!(content.contains("[review]"));

    // The template is all comments, so it must parse to the defaults.
    let config: revue_core::RevueConfig = toml::from_str(&content).unwrap();
    assert_eq!(config.review.exclude, vec!["dist", "bun.lock"]);
    assert_eq!(config.review.max_steps, 8);
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".revue.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_revue"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let content = std::fs::read_to_string(dir.path().join(".revue.toml")).unwrap();
    assert_eq!(content, "# existing");
}

#[test]
fn config_file_drives_excludes() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("custom.toml");
    std::fs::write(&config, "[review]\nexclude = [\"generated.ts\"]\n").unwrap();
    let patch = dir.path().join("changes.patch");
    std::fs::write(
        &patch,
        "\
diff --git a/generated.ts b/generated.ts
--- a/generated.ts
+++ b/generated.ts
@@ -1 +1,2 @@
 a();
+b();
",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_revue"))
        .args(["--format", "json", "--config"])
        .arg(&config)
        .args(["metrics", "--file"])
        .arg(&patch)
        .output()
        .unwrap();

    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["filesChanged"], 0);
    assert_eq!(parsed["skipped"][0], "generated.ts");
}
