//! CLI smoke tests over temporary model directories.

use assert_cmd::Command;
use predicates::prelude::*;

/// Write a minimal model directory: descriptor plus one position-only buffer.
fn write_model(dir: &std::path::Path, hash: &str, positions: &[[f32; 3]]) {
    let descriptor = format!(r#"{{"components": [{{"vb0_hash": "{hash}"}}]}}"#);
    std::fs::write(dir.join("Metadata.json"), descriptor).unwrap();

    let mut bytes = Vec::new();
    for p in positions {
        for v in p {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
    }
    std::fs::write(dir.join("Component 0.vb"), bytes).unwrap();
}

#[test]
fn test_help() {
    Command::cargo_bin("lod-matcher")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("match"))
        .stdout(predicate::str::contains("inspect"));
}

#[test]
fn test_inspect_lists_components() {
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "aaaa1111", &[[0.0, 0.0, 0.0]]);

    Command::cargo_bin("lod-matcher")
        .unwrap()
        .args(["inspect", dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Component 0"))
        .stdout(predicate::str::contains("aaaa1111"));
}

#[test]
fn test_inspect_json_output() {
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "aaaa1111", &[[0.0, 0.0, 0.0]]);

    Command::cargo_bin("lod-matcher")
        .unwrap()
        .args(["inspect", dir.path().to_str().unwrap(), "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"Component 0\""));
}

#[test]
fn test_inspect_missing_descriptor_fails() {
    let dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("lod-matcher")
        .unwrap()
        .args(["inspect", dir.path().to_str().unwrap()])
        .assert()
        .failure();
}

#[test]
fn test_match_pairs_identical_geometry() {
    let full_dir = tempfile::tempdir().unwrap();
    let lod_dir = tempfile::tempdir().unwrap();
    let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    write_model(full_dir.path(), "aaaa1111", &positions);
    write_model(lod_dir.path(), "bbbb2222", &positions);

    Command::cargo_bin("lod-matcher")
        .unwrap()
        .args([
            "match",
            full_dir.path().to_str().unwrap(),
            lod_dir.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("aaaa1111 -> Component 0"))
        .stdout(predicate::str::contains("geometry"));
}

#[test]
fn test_match_json_report() {
    let full_dir = tempfile::tempdir().unwrap();
    let lod_dir = tempfile::tempdir().unwrap();
    let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
    write_model(full_dir.path(), "aaaa1111", &positions);
    write_model(lod_dir.path(), "aaaa1111", &positions);

    Command::cargo_bin("lod-matcher")
        .unwrap()
        .args([
            "match",
            full_dir.path().to_str().unwrap(),
            lod_dir.path().to_str().unwrap(),
            "--format",
            "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"created_at\""))
        .stdout(predicate::str::contains("\"method\": \"hash\""));
}
