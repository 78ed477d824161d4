//! Tests for the folio binary
//!
//! This tests:
//! - `check` accepts valid documents and fails on invalid ones
//! - `replay` writes the resulting document
//! - `simulate` reads its settings from folio.config.json

use std::fs;
use std::process::Command;
use tempfile::TempDir;

const DOC: &str = r#"{"type": "doc", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "hi"}]}]}"#;

fn folio(dir: &TempDir) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_folio"));
    command.arg("--cwd").arg(dir.path()).env("RUST_LOG", "off");
    command
}

#[test]
fn test_check_reports_invalid_documents() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("good.json"), DOC).unwrap();
    let good = folio(&dir).arg("check").arg(dir.path().join("good.json")).output().unwrap();
    assert!(good.status.success());

    fs::write(
        dir.path().join("bad.json"),
        r#"{"type": "doc", "content": [{"type": "text", "text": "loose"}]}"#,
    )
    .unwrap();
    let all = folio(&dir).arg("check").arg(dir.path()).output().unwrap();
    assert!(!all.status.success());
    assert!(String::from_utf8_lossy(&all.stderr).contains("bad.json"));
}

#[test]
fn test_replay_writes_output() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("doc.json"), DOC).unwrap();
    fs::write(
        dir.path().join("steps.json"),
        r#"[{"stepType": "replace", "from": 3, "to": 3, "slice": {"content": [{"type": "text", "text": "!"}]}}]"#,
    )
    .unwrap();
    let out = dir.path().join("out.json");

    let status = folio(&dir)
        .arg("replay")
        .arg(dir.path().join("doc.json"))
        .arg(dir.path().join("steps.json"))
        .arg("--verify")
        .arg("--output")
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["content"][0]["content"][0]["text"], "hi!");
}

#[test]
fn test_simulate_uses_config() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("folio.config.json"),
        r#"{"simulation": {"clients": 2, "rounds": 3}}"#,
    )
    .unwrap();

    let output = folio(&dir).arg("simulate").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Clients: 2"));
    assert!(stdout.contains("Edits:   6"));
}
