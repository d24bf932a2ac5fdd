//! Integration tests for the schaapi CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

/// Test helper to get the CLI binary
fn schaapi_cmd() -> Command {
    Command::cargo_bin("schaapi").unwrap()
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_cli_help() {
    schaapi_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("mine"))
        .stdout(predicate::str::contains("print-default-config"));
}

#[test]
fn test_mine_prints_pattern_table() {
    schaapi_cmd()
        .args(["mine", "--corpus"])
        .arg(fixture("list_corpus.json"))
        .args(["--min-support", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Patterns found"))
        .stdout(predicate::str::contains("ArrayList.<init>()"))
        .stdout(predicate::str::contains("List.add(Object)"));
}

#[test]
fn test_mine_writes_report_and_export() {
    let dir = tempdir().unwrap();
    let report = dir.path().join("report.json");
    let export = dir.path().join("patterns.json");

    schaapi_cmd()
        .args(["mine", "--quiet", "--library", "java.util", "--min-support", "3"])
        .arg("--corpus")
        .arg(fixture("list_corpus.json"))
        .arg("--out")
        .arg(&report)
        .arg("--export")
        .arg(&export)
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(report["statistics"]["projects"], 3);
    assert_eq!(report["statistics"]["methods"], 4);
    assert_eq!(report["statistics"]["empty_graphs"], 1);
    assert_eq!(report["patterns"].as_array().unwrap().len(), 1);

    let export: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&export).unwrap()).unwrap();
    let records = export.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["support"], 3);
    assert_eq!(records[0]["nodes"].as_array().unwrap().len(), 3);
    assert_eq!(records[0]["exemplar_embedding"].as_array().unwrap().len(), 3);
    assert_eq!(records[0]["exemplar_embedding"][0]["kind"], "new");
    assert_eq!(records[0]["exemplar_nodes"].as_array().unwrap().len(), 3);
}

#[test]
fn test_mine_writes_dot_files() {
    let dir = tempdir().unwrap();
    let dot_dir = dir.path().join("dot");

    schaapi_cmd()
        .args(["mine", "--quiet", "--min-support", "3", "--corpus"])
        .arg(fixture("list_corpus.json"))
        .arg("--dot")
        .arg(&dot_dir)
        .assert()
        .success();

    let dot = fs::read_to_string(dot_dir.join("pattern-001.dot")).unwrap();
    assert!(dot.starts_with("digraph {"));
    assert!(dot.contains("java.util.ArrayList.<init>()"));
}

#[test]
fn test_mine_csv_report_by_extension() {
    let dir = tempdir().unwrap();
    let report = dir.path().join("sizes.csv");

    schaapi_cmd()
        .args(["mine", "--quiet"])
        .arg("--corpus")
        .arg(fixture("list_corpus.json"))
        .arg("--out")
        .arg(&report)
        .assert()
        .success();

    let csv = fs::read_to_string(&report).unwrap();
    assert!(csv.starts_with("size,graphs,mined_patterns,reported_patterns"));
    assert!(csv.lines().any(|line| line.starts_with("3,3,")));
}

#[test]
fn test_mine_rejects_support_below_two() {
    schaapi_cmd()
        .args(["mine", "--quiet", "--min-support", "1", "--corpus"])
        .arg(fixture("list_corpus.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("min_support"));
}

#[test]
fn test_mine_missing_corpus_fails() {
    schaapi_cmd()
        .args(["mine", "--corpus", "/no/such/corpus.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read corpus file"));
}

#[test]
fn test_print_default_config() {
    schaapi_cmd()
        .arg("print-default-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("min_support: 2"))
        .stdout(predicate::str::contains("max_pattern_size: 8"));
}

#[test]
fn test_init_and_validate_config() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("schaapi.yml");

    schaapi_cmd()
        .arg("init-config")
        .arg("--output")
        .arg(&config)
        .assert()
        .success();
    assert!(config.exists());

    schaapi_cmd()
        .arg("init-config")
        .arg("--output")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    schaapi_cmd()
        .arg("validate-config")
        .arg("--config")
        .arg(&config)
        .arg("--detailed")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file is valid"))
        .stdout(predicate::str::contains("normalization.max_label_iterations"));
}

#[test]
fn test_validate_config_rejects_low_support() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("bad.yml");
    fs::write(&config, "mining:\n  min_support: 1\n").unwrap();

    schaapi_cmd()
        .arg("validate-config")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration validation failed"));
}

#[test]
fn test_mine_uses_config_file() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("schaapi.yml");
    fs::write(&config, "mining:\n  min_support: 4\n").unwrap();
    let report = dir.path().join("report.json");

    schaapi_cmd()
        .args(["mine", "--quiet", "--corpus"])
        .arg(fixture("list_corpus.json"))
        .arg("--config")
        .arg(&config)
        .arg("--out")
        .arg(&report)
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert!(report["patterns"].as_array().unwrap().is_empty());
}

#[test]
fn test_summarize_tests_reports_failures() {
    let dir = tempdir().unwrap();
    let results = dir.path().join("results.json");
    fs::write(
        &results,
        r#"[
            {"class": "ListPatternTest", "name": "replay", "status": "PASSED"},
            {"class": "ListPatternTest", "name": "skipped", "status": "IGNORED"},
            {"class": "IteratorPatternTest", "name": "replay", "status": "FAILED",
             "message": "ConcurrentModificationException"}
        ]"#,
    )
    .unwrap();

    schaapi_cmd()
        .arg("summarize-tests")
        .arg("--results")
        .arg(&results)
        .assert()
        .failure()
        .stdout(predicate::str::contains("IteratorPatternTest.replay"))
        .stderr(predicate::str::contains("1 of 3 tests failed"));
}

#[test]
fn test_summarize_tests_passes_without_failures() {
    let dir = tempdir().unwrap();
    let results = dir.path().join("results.json");
    fs::write(
        &results,
        r#"[{"class": "T", "name": "a", "status": "PASSED"},
            {"class": "T", "name": "b", "status": "IGNORED"}]"#,
    )
    .unwrap();

    schaapi_cmd()
        .arg("summarize-tests")
        .arg("--results")
        .arg(&results)
        .assert()
        .success()
        .stdout(predicate::str::contains("ListPatternTest").not());
}
