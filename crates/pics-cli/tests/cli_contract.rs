use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const INLINE_REQUEST: &str = r#"{
    "pics_items": [
        {"item_id": "A.1", "value": true},
        {"item_id": "A.2", "value": false}
    ],
    "spec_data": {
        "test_cases": [
            {"test_id": "TC-1", "applicability_condition": "C1", "comment": "D4"},
            {"test_id": "TC-2", "applicability_condition": "C2"},
            {"test_id": "TC-3", "applicability_condition": ""}
        ],
        "c_conditions": [
            {"condition_id": "C1", "definition": "IF A.1 AND NOT A.2 THEN M ELSE N/A"},
            {"condition_id": "C2", "definition": "IF A.2 THEN O ELSE N/A"}
        ]
    }
}"#;

fn pics() -> Command {
    let mut cmd = Command::cargo_bin("pics").unwrap();
    for var in [
        "PICS_PARSER_URL",
        "PICS_PARSER_TOKEN",
        "PICS_BATCH_SIZE",
        "PICS_DATABASE",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn write_request(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("request.json");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn version_prints_crate_version() {
    pics()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn filter_writes_json_to_stdout() {
    let dir = tempdir().unwrap();
    let request = write_request(dir.path(), INLINE_REQUEST);

    let output = pics()
        .args(["filter", "--request"])
        .arg(&request)
        .output()
        .unwrap();
    assert!(output.status.success());

    let v: Value = serde_json::from_slice(&output.stdout).expect("stdout is not JSON");
    assert_eq!(v["matched_test_ids"], serde_json::json!(["TC-1", "TC-3"]));
    assert_eq!(v["evaluation_breakdown"]["N/A"], 1);
    assert_eq!(v["test_cases"][0]["d_selections"], serde_json::json!(["D4"]));
    assert_eq!(v["metadata"]["success_rate"], 100.0);
}

#[test]
fn filter_text_format_to_file() {
    let dir = tempdir().unwrap();
    let request = write_request(dir.path(), INLINE_REQUEST);
    let out = dir.path().join("report.txt");

    pics()
        .args(["filter", "--format", "text", "--explain", "--request"])
        .arg(&request)
        .arg("--output")
        .arg(&out)
        .assert()
        .success();

    let text = fs::read_to_string(&out).unwrap();
    assert!(text.contains("Matched 2 of 3 test cases"));
    assert!(text.contains("Antecedent: A.1 AND NOT A.2"));
}

#[test]
fn filter_text_format_to_stdout() {
    let dir = tempdir().unwrap();
    let request = write_request(dir.path(), INLINE_REQUEST);

    pics()
        .args(["filter", "--format", "text", "--request"])
        .arg(&request)
        .assert()
        .success()
        .stdout(predicate::str::contains("Matched 2 of 3 test cases"))
        .stdout(predicate::str::contains("Antecedent").not());
}

#[test]
fn filter_json_to_file() {
    let dir = tempdir().unwrap();
    let request = write_request(dir.path(), INLINE_REQUEST);
    let out = dir.path().join("report.json");

    pics()
        .args(["filter", "--request"])
        .arg(&request)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let v: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(v["matched_count"], 2);
}

#[test]
fn fail_on_empty_exits_one() {
    let dir = tempdir().unwrap();
    let request = write_request(
        dir.path(),
        r#"{"pics_items": [], "spec_data": {"test_cases": [{"test_id": "T1", "applicability_condition": "N/A"}]}}"#,
    );

    pics()
        .args(["filter", "--fail-on-empty", "--request"])
        .arg(&request)
        .assert()
        .code(1);
}

#[test]
fn request_without_catalog_exits_two() {
    let dir = tempdir().unwrap();
    let request = write_request(dir.path(), r#"{"pics_items": []}"#);

    pics()
        .args(["filter", "--request"])
        .arg(&request)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid request"));
}

#[test]
fn missing_database_exits_two() {
    let dir = tempdir().unwrap();
    let request = write_request(
        dir.path(),
        r#"{"pics_items": [], "specification_id": "SPEC-1"}"#,
    );

    pics()
        .args(["filter", "--request"])
        .arg(&request)
        .arg("--db")
        .arg(dir.path().join("missing.db"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("condition store not found"));
}

#[test]
fn eval_prints_outcome_and_trace() {
    let dir = tempdir().unwrap();
    let pics_path = dir.path().join("pics.json");
    fs::write(&pics_path, r#"{"A.1": true, "A.1.2": false}"#).unwrap();

    pics()
        .args(["eval", "--expr", "IF A.1.2 OR A.1 THEN O ELSE N/A", "--pics"])
        .arg(&pics_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Result: O"))
        .stdout(predicate::str::contains("A.1.2 = false"));
}

#[test]
fn eval_offline_free_form_defaults_to_required() {
    pics()
        .args(["eval", "--format", "json", "--expr", "Mandatory for all devices"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"result\": \"R\""))
        .stdout(predicate::str::contains("\"failures\": 1"));
}
