use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_init_validate_status() {
    let dir = tempfile::tempdir().unwrap();

    // Init project
    cargo_bin_cmd!("granary")
        .args(["init", dir.path().to_str().unwrap(), "--name", "movies-warehouse"])
        .assert()
        .success();

    // Verify generated files exist
    assert!(dir.path().join("granary.yaml").exists());
    assert!(dir.path().join("data/movie_awards.csv").exists());
    assert!(dir.path().join("data/users.csv").exists());

    let config_arg = dir.path().join("granary.yaml");
    let config_arg = config_arg.to_str().unwrap();

    // Validate the scaffolded project
    cargo_bin_cmd!("granary")
        .args(["--config", config_arg, "validate"])
        .assert()
        .success();

    // Status reports the project and its tables
    cargo_bin_cmd!("granary")
        .args(["--config", config_arg, "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("movies-warehouse"))
        .stdout(predicate::str::contains("FactWatchs"));

    // JSON status is parseable
    let output = cargo_bin_cmd!("granary")
        .args(["--config", config_arg, "status", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["name"], "movies-warehouse");
    assert_eq!(status["files"]["users"]["exists"], true);
}

#[test]
fn test_init_refuses_existing_project() {
    let dir = tempfile::tempdir().unwrap();

    cargo_bin_cmd!("granary")
        .args(["init", dir.path().to_str().unwrap()])
        .assert()
        .success();

    cargo_bin_cmd!("granary")
        .args(["init", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already contains"));
}

#[test]
fn test_validate_missing_feed_fails() {
    let dir = tempfile::tempdir().unwrap();

    cargo_bin_cmd!("granary")
        .args(["init", dir.path().to_str().unwrap()])
        .assert()
        .success();
    std::fs::remove_file(dir.path().join("data/users.csv")).unwrap();

    let config_arg = dir.path().join("granary.yaml");
    cargo_bin_cmd!("granary")
        .args(["--config", config_arg.to_str().unwrap(), "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("users feed not found"));
}

#[test]
fn test_validate_missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config_arg = dir.path().join("granary.yaml");

    cargo_bin_cmd!("granary")
        .args(["--config", config_arg.to_str().unwrap(), "validate"])
        .assert()
        .failure();
}
