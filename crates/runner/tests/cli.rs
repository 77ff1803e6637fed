//! Drives the `wirelog` binary end to end.

use std::path::Path;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use rusqlite::{Connection, params};

fn wirelog(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wirelog"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn wirelog")
}

fn seed_db(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch("CREATE TABLE message (id INTEGER PRIMARY KEY, dir INTEGER, raw TEXT);")
        .unwrap();
    let rows = [
        (1, 0, r#"{"op": 10, "d": {"heartbeat_interval": 41250}}"#),
        (2, 1, r#"{"op": 2, "d": {"token": "x"}}"#),
        (3, 0, r#"{"op": 0, "t": "CHANNEL_CREATE", "d": {"is_private": true, "id": "<1>"}}"#),
        (4, 0, r#"{"op": 0, "t": "MESSAGE_UPDATE", "d": {"id": "7", "embeds": []}}"#),
        (5, 0, "{oops"),
    ];
    for (id, dir, raw) in rows {
        conn.execute(
            "INSERT INTO message (id, dir, raw) VALUES (?1, ?2, ?3)",
            params![id, dir, raw],
        )
        .unwrap();
    }
}

#[test]
fn test_prepare_then_render() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("log.db");
    let prepared = dir.path().join("prepared.json");
    seed_db(&db);

    let out = wirelog(&["--db", db.to_str().unwrap(), "prepare", prepared.to_str().unwrap()]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(out.stdout.is_empty());
    assert!(prepared.exists());

    let out = wirelog(&["render", prepared.to_str().unwrap()]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let html = String::from_utf8(out.stdout).unwrap();

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains(">CHANNEL_CREATE (private)</a>"));
    assert!(html.contains(">MESSAGE_UPDATE (partial)</a>"));
    assert!(html.contains(">op 10 (HELLO)</a>"));
    assert!(html.contains("&quot;&lt;1&gt;&quot;"));
    assert!(html.contains("from 5 rows (3 merged, 1 dropped, 1 malformed)"));
}

#[test]
fn test_prepare_with_filter() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("log.db");
    let prepared = dir.path().join("prepared.json");
    seed_db(&db);

    let out = wirelog(&[
        "--db",
        db.to_str().unwrap(),
        "prepare",
        prepared.to_str().unwrap(),
        "id <= 2",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let html = String::from_utf8(wirelog(&["render", prepared.to_str().unwrap()]).stdout).unwrap();
    assert!(html.contains(">op 10 (HELLO)</a>"));
    assert!(!html.contains("CHANNEL_CREATE"));
}

#[test]
fn test_config_file_supplies_source() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("log.db");
    let prepared = dir.path().join("prepared.json");
    let config = dir.path().join("wirelog.yaml");
    seed_db(&db);
    std::fs::write(
        &config,
        format!(
            "source:\n  path: {}\nreport:\n  title: Capture 42\nlogging:\n  level: warn\n",
            db.display()
        ),
    )
    .unwrap();

    let cfg = config.to_str().unwrap();
    let out = wirelog(&["-c", cfg, "prepare", prepared.to_str().unwrap()]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let out = wirelog(&["-c", cfg, "render", prepared.to_str().unwrap()]);
    let html = String::from_utf8(out.stdout).unwrap();
    assert!(html.contains("<title>Capture 42</title>"));
}

#[test]
fn test_usage_on_missing_arguments() {
    let out = wirelog(&[]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stdout).contains("prepare"));

    let out = wirelog(&["prepare"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Usage"));

    let out = wirelog(&["explode"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn test_render_missing_file_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let out = wirelog(&["render", dir.path().join("absent.json").to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
}

#[test]
fn test_prepare_without_database_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = wirelog(&["prepare", dir.path().join("x.json").to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("no message database"));
}
