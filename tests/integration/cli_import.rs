#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write csv");
    path
}

fn city_files() -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let nodes = write_csv(
        dir.path(),
        "City.csv",
        "id,name,pop\nparis,Paris,2000000\nlyon,Lyon,500000\n",
    );
    let edges = write_csv(dir.path(), "ROAD.csv", "src,dst,km\nparis,lyon,465\n");
    (dir, nodes, edges)
}

#[test]
fn dry_run_reports_json_summary() {
    let (dir, nodes, edges) = city_files();
    let output = cargo_bin_cmd!("graphload")
        .env("GRAPHLOAD_CONFIG", dir.path().join("cli.toml"))
        .args(["--format", "json", "import", "--graph", "cities", "--dry-run"])
        .arg("--nodes")
        .arg(&nodes)
        .arg("--edges")
        .arg(&edges)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["graph"], "cities");
    assert_eq!(json["nodes"], 2);
    assert_eq!(json["edges"], 1);
    assert_eq!(json["tasks"], 1);
    assert_eq!(json["replies"][0], "2 nodes created, 1 relations created");
}

#[test]
fn small_ceiling_splits_into_several_commands() {
    let (dir, nodes, edges) = city_files();
    let output = cargo_bin_cmd!("graphload")
        .env("GRAPHLOAD_CONFIG", dir.path().join("cli.toml"))
        .args(["--format", "json", "import", "--graph", "cities", "--dry-run"])
        .args(["--max-task-bytes", "40"])
        .arg("--nodes")
        .arg(&nodes)
        .arg("--edges")
        .arg(&edges)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["tasks"], 3);
    assert_eq!(json["replies"][0], "1 nodes created, 0 relations created");
    assert_eq!(json["replies"][2], "0 nodes created, 1 relations created");
}

#[test]
fn unknown_endpoint_fails_with_location() {
    let dir = TempDir::new().expect("tempdir");
    let nodes = write_csv(dir.path(), "N.csv", "id\na\n");
    let edges = write_csv(dir.path(), "E.csv", "src,dst\na,missing\n");
    let assert = cargo_bin_cmd!("graphload")
        .env("GRAPHLOAD_CONFIG", dir.path().join("cli.toml"))
        .args(["import", "--graph", "g", "--dry-run"])
        .arg("--nodes")
        .arg(&nodes)
        .arg("--edges")
        .arg(&edges)
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("E.csv:2"), "stderr: {stderr}");
    assert!(stderr.contains("missing"), "stderr: {stderr}");
}

#[test]
fn graph_name_can_come_from_profile() {
    let (dir, nodes, _edges) = city_files();
    let config = dir.path().join("cli.toml");
    fs::write(
        &config,
        "default_profile = \"local\"\n\n[profiles.local]\ngraph = \"from_profile\"\n",
    )
    .expect("write config");
    let output = cargo_bin_cmd!("graphload")
        .env("GRAPHLOAD_CONFIG", &config)
        .args(["--format", "json", "import", "--dry-run"])
        .arg("--nodes")
        .arg(&nodes)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["graph"], "from_profile");
}

#[test]
fn conflicting_label_flags_are_rejected() {
    let (dir, nodes, _edges) = city_files();
    cargo_bin_cmd!("graphload")
        .env("GRAPHLOAD_CONFIG", dir.path().join("cli.toml"))
        .args(["import", "--graph", "g", "--dry-run"])
        .args(["--node-label", "City", "--node-label-column", "name"])
        .arg("--nodes")
        .arg(&nodes)
        .assert()
        .failure();
}
