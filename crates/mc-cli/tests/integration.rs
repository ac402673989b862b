#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn mc(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mc").unwrap();
    cmd.current_dir(dir.path()).env("MC_ROOT", dir.path());
    cmd
}

fn init_project(dir: &TempDir) {
    mc(dir).arg("init").assert().success();
}

fn json_output(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.arg("--json").output().unwrap();
    assert!(output.status.success(), "{:?}", output);
    serde_json::from_slice(&output.stdout).unwrap()
}

fn version_of(dir: &TempDir, key: &str) -> String {
    let json = json_output(mc(dir).args(["version", key]));
    json["version"].as_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// mc init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_directory_tree() {
    let dir = TempDir::new().unwrap();
    mc(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: .mission-control/config.yaml"));

    assert!(dir.path().join(".mission-control/config.yaml").exists());
    assert!(dir.path().join(".mission-control/data").is_dir());
    assert!(dir.path().join(".mission-control/data/.locks").is_dir());
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    mc(&dir).arg("init").assert().success();
    mc(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  .mission-control/config.yaml"));
}

#[test]
fn init_keeps_existing_config() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let path = dir.path().join(".mission-control/config.yaml");
    let mut config: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    config["project"]["name"] = "renamed".into();
    std::fs::write(&path, serde_yaml::to_string(&config).unwrap()).unwrap();

    mc(&dir).arg("init").assert().success();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("renamed"));
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[test]
fn missing_document_version_is_absent() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    mc(&dir)
        .args(["version", "notes.json"])
        .assert()
        .success()
        .stdout("absent\n");
}

#[test]
fn put_and_get_round_trip() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let file = dir.path().join("notes.json");
    std::fs::write(&file, r#"{"title": "Q3 plan"}"#).unwrap();

    mc(&dir)
        .args(["put", "notes.json"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote notes.json"));

    let json = json_output(mc(&dir).args(["get", "notes.json"]));
    assert_eq!(json["data"]["title"], "Q3 plan");
    assert_eq!(json["version"].as_str().unwrap(), version_of(&dir, "notes.json"));

    mc(&dir)
        .arg("keys")
        .assert()
        .success()
        .stdout(predicate::str::contains("notes.json"));
}

#[test]
fn put_reads_stdin() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    mc(&dir)
        .args(["put", "brief.json", "-"])
        .write_stdin(r#"{"status": "draft"}"#)
        .assert()
        .success();

    let json = json_output(mc(&dir).args(["get", "brief.json"]));
    assert_eq!(json["data"]["status"], "draft");
}

#[test]
fn put_with_stale_version_fails() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    mc(&dir)
        .args(["put", "brief.json", "-"])
        .write_stdin(r#"{"status": "draft"}"#)
        .assert()
        .success();
    let stale = version_of(&dir, "brief.json");

    mc(&dir)
        .args(["put", "brief.json", "-", "--expect", &stale])
        .write_stdin(r#"{"status": "review"}"#)
        .assert()
        .success();

    mc(&dir)
        .args(["put", "brief.json", "-", "--expect", &stale])
        .write_stdin(r#"{"status": "final"}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("modified by another process"));

    let json = json_output(mc(&dir).args(["get", "brief.json"]));
    assert_eq!(json["data"]["status"], "review");
}

#[test]
fn put_create_only_with_absent() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    mc(&dir)
        .args(["put", "brief.json", "-", "--expect", "absent"])
        .write_stdin("{}")
        .assert()
        .success();
    mc(&dir)
        .args(["put", "brief.json", "-", "--expect", "absent"])
        .write_stdin("{}")
        .assert()
        .failure();
}

#[test]
fn put_rejects_invalid_json_and_key() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    mc(&dir)
        .args(["put", "brief.json", "-"])
        .write_stdin("{ nope")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid JSON"));

    mc(&dir)
        .args(["put", "../escape.json", "-"])
        .write_stdin("{}")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid document key"));
}

#[test]
fn patch_deep_merges() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    mc(&dir)
        .args(["put", "brief.json", "-"])
        .write_stdin(r#"{"a": {"x": 0, "y": 2}, "tags": ["old"]}"#)
        .assert()
        .success();

    mc(&dir)
        .args(["patch", "brief.json", r#"{"a": {"x": 1}, "tags": ["new"]}"#])
        .assert()
        .success();

    let json = json_output(mc(&dir).args(["get", "brief.json"]));
    assert_eq!(
        json["data"],
        serde_json::json!({"a": {"x": 1, "y": 2}, "tags": ["new"]})
    );
}

#[test]
fn patch_with_bad_version_token_fails() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    mc(&dir)
        .args(["patch", "brief.json", "{}", "--expect", "v1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid version token"));
}

#[test]
fn corrupt_document_is_reported() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::write(
        dir.path().join(".mission-control/data/tasks.json"),
        "{ oops",
    )
    .unwrap();

    mc(&dir)
        .args(["get", "tasks.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupt document"));
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[test]
fn task_add_list_and_status() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    let created = json_output(mc(&dir).args([
        "task",
        "add",
        "Draft",
        "launch",
        "thread",
        "--assignee",
        "scribe",
    ]));
    let id = created["task"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["task"]["title"], "Draft launch thread");

    mc(&dir)
        .args(["task", "status", &id, "done"])
        .assert()
        .success()
        .stdout(predicate::str::contains("done"));

    let board = json_output(mc(&dir).args(["task", "list"]));
    assert_eq!(board["tasks"][0]["status"], "done");
    assert_eq!(board["tasks"][0]["assignee"], "scribe");
    assert_eq!(board["summary"], "1/1 done, 0 in progress, 0 blocked");
}

#[test]
fn task_status_rejects_unknown_values() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    let created = json_output(mc(&dir).args(["task", "add", "Review PRD"]));
    let id = created["task"]["id"].as_str().unwrap().to_string();

    mc(&dir)
        .args(["task", "status", &id, "finished"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not match its schema"));

    mc(&dir)
        .args(["task", "status", "task-missing", "done"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("task not found"));
}

#[test]
fn task_patch_merges_and_rejects_bad_input() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    let created = json_output(mc(&dir).args([
        "task",
        "add",
        "Schedule",
        "posts",
        "--assignee",
        "scribe",
    ]));
    let id = created["task"]["id"].as_str().unwrap().to_string();

    let patched = json_output(mc(&dir).args([
        "task",
        "patch",
        &id,
        r#"{"status": "review", "channel": {"name": "x", "slot": 2}}"#,
    ]));
    assert_eq!(patched["task"]["status"], "review");
    assert_eq!(patched["task"]["assignee"], "scribe");
    assert_eq!(patched["task"]["channel"]["slot"], 2);

    mc(&dir)
        .args(["task", "patch", &id, r#"{"channel": {"slot": 3}}"#])
        .assert()
        .success();
    let board = json_output(mc(&dir).args(["task", "list"]));
    assert_eq!(board["tasks"][0]["channel"], serde_json::json!({"name": "x", "slot": 3}));

    mc(&dir)
        .args(["task", "patch", "task-missing", r#"{"status": "done"}"#])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("task not found"));

    let before = json_output(mc(&dir).args(["task", "list"]));
    mc(&dir)
        .args(["task", "patch", &id, r#"{"title": 42}"#])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("does not match its schema"));
    let after = json_output(mc(&dir).args(["task", "list"]));
    assert_eq!(before, after);
}

#[test]
fn task_list_table_on_empty_board() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    mc(&dir)
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks."));
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

#[test]
fn activity_add_and_list_newest_first() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    for action in ["opened", "closed"] {
        mc(&dir)
            .args(["activity", "add", "atlas", action])
            .assert()
            .success();
    }

    let json = json_output(mc(&dir).args(["activity", "list", "--limit", "1"]));
    let entries = json["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "closed");
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[test]
fn config_show_reports_defaults() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    let json = json_output(mc(&dir).args(["config", "show"]));
    assert_eq!(json["retry"]["max_retries"], 3);
    assert_eq!(json["retry"]["base_delay_ms"], 100);
    assert!(json["data_dir"]
        .as_str()
        .unwrap()
        .ends_with(".mission-control/data"));
}

#[test]
fn config_validate_clean_project() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    mc(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_requires_init() {
    let dir = TempDir::new().unwrap();
    mc(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}
