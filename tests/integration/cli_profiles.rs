#![allow(missing_docs)]

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn set_list_and_delete_profiles() {
    let dir = TempDir::new().expect("tempdir");
    let config = dir.path().join("conf").join("cli.toml");

    cargo_bin_cmd!("graphload")
        .env("GRAPHLOAD_CONFIG", &config)
        .args(["profile", "set", "staging", "--host", "redis.internal"])
        .args(["--port", "6380", "--password", "hunter2", "--graph", "social"])
        .assert()
        .success();
    cargo_bin_cmd!("graphload")
        .env("GRAPHLOAD_CONFIG", &config)
        .args(["profile", "default", "staging"])
        .assert()
        .success();

    let raw = fs::read_to_string(&config).expect("config written");
    assert!(raw.contains("default_profile = \"staging\""));
    assert!(raw.contains("redis.internal"));

    let output = cargo_bin_cmd!("graphload")
        .env("GRAPHLOAD_CONFIG", &config)
        .args(["--format", "json", "profile", "show", "staging"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["host"], "redis.internal");
    assert_eq!(json["port"], 6380);
    assert_eq!(json["graph"], "social");
    assert!(json.get("password").is_none(), "password must not be printed");

    cargo_bin_cmd!("graphload")
        .env("GRAPHLOAD_CONFIG", &config)
        .args(["profile", "delete", "staging"])
        .assert()
        .success();
    let output = cargo_bin_cmd!("graphload")
        .env("GRAPHLOAD_CONFIG", &config)
        .args(["--format", "json", "profile", "list"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json, Value::Array(Vec::new()));
}

#[test]
fn unknown_profile_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    cargo_bin_cmd!("graphload")
        .env("GRAPHLOAD_CONFIG", dir.path().join("cli.toml"))
        .args(["profile", "show", "nope"])
        .assert()
        .failure();
}

#[test]
fn completions_are_generated() {
    let output = cargo_bin_cmd!("graphload")
        .args(["completions", "bash"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert!(String::from_utf8_lossy(&output).contains("graphload"));
}
