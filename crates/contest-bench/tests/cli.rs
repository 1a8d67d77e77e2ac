use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn write_config(dir: &Path) -> PathBuf {
    let yaml = format!(
        r#"
run_id: "cli_run"
source:
  synthetic:
    seed: 99
    contestants: 12
    judges: 2
    pairings: 3
    top_limits: [6, 3]
outputs:
  jsonl: "{out}/{{run_id}}/leaderboard.jsonl"
  summary_md: "{out}/{{run_id}}/summary.md"
  plots_dir: "{out}/{{run_id}}/plots"
"#,
        out = dir.display()
    );
    let path = dir.join("leaderboard.yaml");
    fs::write(&path, yaml).expect("write config");
    path
}

#[test]
fn validate_only_skips_the_run() {
    let dir = tempdir().expect("temp dir");
    let config = write_config(dir.path());

    Command::cargo_bin("contest-bench")
        .expect("binary built")
        .arg("--config")
        .arg(&config)
        .arg("--validate-only")
        .assert()
        .success()
        .stdout(predicate::str::contains("Validation-only mode"));

    assert!(!dir.path().join("cli_run").join("leaderboard.jsonl").exists());
}

#[test]
fn rejects_invalid_run_id_override() {
    let dir = tempdir().expect("temp dir");
    let config = write_config(dir.path());

    Command::cargo_bin("contest-bench")
        .expect("binary built")
        .arg("--config")
        .arg(&config)
        .args(["--run-id", "not a valid id!"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("run_id"));
}

#[test]
fn structured_run_writes_telemetry_summary() {
    let dir = tempdir().expect("temp dir");
    let config = write_config(dir.path());

    Command::cargo_bin("contest-bench")
        .expect("binary built")
        .arg("--config")
        .arg(&config)
        .args(["--log-level", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Leaderboard complete for 'cli_run'"));

    let run_dir = dir.path().join("cli_run");
    assert!(run_dir.join("leaderboard.jsonl").exists());
    assert!(run_dir.join("telemetry.jsonl").exists());

    let summary = fs::read_to_string(run_dir.join("telemetry_summary.json")).expect("telemetry summary");
    let value: serde_json::Value = serde_json::from_str(&summary).expect("summary json");
    assert!(value["cutoff"].is_object());

    let markdown = fs::read_to_string(run_dir.join("summary.md")).expect("summary markdown");
    assert!(markdown.contains("## Telemetry Highlights"));
}
