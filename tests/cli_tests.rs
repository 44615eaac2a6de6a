// CLI integration tests for the huella binary

mod utils;

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;
use utils::{behavior_vector, feature_arg};

fn huella(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("huella").unwrap();
    cmd.env_remove("HUELLA_DATA_DIR")
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(dir.path());
    cmd
}

fn seeded_config(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("huella.toml");
    fs::write(&path, "[augment]\nseed = 99\n").unwrap();
    path
}

#[test]
fn test_enroll_then_authenticate_text() {
    let dir = TempDir::new().unwrap();
    let config = seeded_config(&dir);
    let sample = feature_arg(&behavior_vector(27, 0.2));

    huella(&dir)
        .arg("--config")
        .arg(&config)
        .args(["enroll", "alice", "--features", &sample])
        .assert()
        .success()
        .stdout(predicate::str::contains("enrolled: model="))
        .stdout(predicate::str::contains("samples=1"));

    huella(&dir)
        .arg("--config")
        .arg(&config)
        .args(["authenticate", "alice", "--features", &sample])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("authenticated: confidence="));
}

#[test]
fn test_enroll_json_matches_http_shape() {
    let dir = TempDir::new().unwrap();
    let output = huella(&dir)
        .args(["--format", "json", "enroll", "alice"])
        .arg("--features")
        .arg(feature_arg(&behavior_vector(6, 0.3)))
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"], "success");
    assert!(["rf", "svm", "mlp"].contains(&json["model_type"].as_str().unwrap()));
    assert_eq!(json["samples_count"], 1);
    assert_eq!(json["candidates"].as_array().unwrap().len(), 3);
}

#[test]
fn test_features_from_json_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("sample.json");
    fs::write(&file, serde_json::to_string(&behavior_vector(4, 0.1)).unwrap()).unwrap();

    huella(&dir)
        .args(["enroll", "alice", "--features-file"])
        .arg(&file)
        .assert()
        .success();

    huella(&dir)
        .args(["expected-features", "alice"])
        .assert()
        .success()
        .stdout("4\n");
}

#[test]
fn test_unenrolled_user_fails_with_exit_1() {
    let dir = TempDir::new().unwrap();
    huella(&dir)
        .args(["authenticate", "bob", "--features", "0.1,0.2"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("User not enrolled: bob"));
}

#[test]
fn test_length_mismatch_json_error() {
    let dir = TempDir::new().unwrap();
    huella(&dir)
        .args(["enroll", "alice", "--features", "0.1,0.2,0.3"])
        .assert()
        .success();

    huella(&dir)
        .args(["--format", "json", "authenticate", "alice", "--features", "0.1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("\"feature_length_mismatch\""))
        .stderr(predicate::str::contains("\"status\": 400"))
        .stderr(predicate::str::contains("expected 3, got 1"));
}

#[test]
fn test_empty_first_enrollment_is_insufficient_data() {
    let dir = TempDir::new().unwrap();
    huella(&dir)
        .args(["enroll", "alice", "--features", ""])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Insufficient data"));

    huella(&dir)
        .arg("users")
        .assert()
        .success()
        .stdout("no users enrolled\n");
}

#[test]
fn test_users_and_default_expected_count() {
    let dir = TempDir::new().unwrap();
    huella(&dir)
        .args(["enroll", "alice", "--features", "0.5,0.25,0.125"])
        .assert()
        .success();

    huella(&dir)
        .args(["--format", "json", "users"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"username\": \"alice\""))
        .stdout(predicate::str::contains("\"enrollments\": 1"));

    huella(&dir)
        .arg("expected-features")
        .assert()
        .success()
        .stdout("27\n");
}

#[test]
fn test_malformed_feature_list_is_rejected() {
    let dir = TempDir::new().unwrap();
    huella(&dir)
        .args(["enroll", "alice", "--features", "0.1,abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("position 1"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "[selection]\ntest_fraction = 2.0\n").unwrap();

    huella(&dir)
        .arg("--config")
        .arg(&config)
        .arg("users")
        .assert()
        .failure()
        .stderr(predicate::str::contains("test_fraction"));
}

#[test]
fn test_threshold_is_not_configurable() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("old.toml");
    fs::write(&config, "[scoring]\nthreshold = 0.9\n").unwrap();

    huella(&dir)
        .arg("--config")
        .arg(&config)
        .arg("users")
        .assert()
        .failure()
        .stderr(predicate::str::contains("threshold"));
}

#[test]
fn test_parallel_processes_enroll_distinct_users() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("fast.toml");
    fs::write(&config, "[augment]\nseed = 5\n\n[selection.forest]\nn_trees = 10\n").unwrap();
    let sample = feature_arg(&behavior_vector(6, 0.2));

    let children: Vec<_> = (0..4)
        .map(|i| {
            std::process::Command::new(assert_cmd::cargo::cargo_bin("huella"))
                .env_remove("HUELLA_DATA_DIR")
                .env_remove("RUST_LOG")
                .arg("--data-dir")
                .arg(dir.path())
                .arg("--config")
                .arg(&config)
                .args(["enroll", &format!("user{}", i), "--features", &sample])
                .stdout(std::process::Stdio::null())
                .spawn()
                .unwrap()
        })
        .collect();
    for mut child in children {
        assert!(child.wait().unwrap().success());
    }

    let output = huella(&dir)
        .args(["--format", "json", "users"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let users: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 4);
    assert!(users.iter().all(|u| u["enrollments"] == 1));
}

#[test]
fn test_debug_flag_emits_stage_transitions() {
    let dir = TempDir::new().unwrap();
    huella(&dir)
        .args(["--debug", "enroll", "alice", "--features", "0.3,0.6"])
        .assert()
        .success()
        .stderr(predicate::str::contains("enrollment stage"));
}
