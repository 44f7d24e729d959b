use phasekeeper::app::command_handlers::run_cli;
use phasekeeper::domain::{PhaseRecord, TaskRecord, TaskStatus, WorkflowRecord, WorkflowStatus};
use phasekeeper::shared::{PhaseId, TaskId, WorkflowId};
use phasekeeper::store::SqliteStore;
use serde_json::Value;
use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{tempdir, TempDir};

struct Workspace {
    dir: TempDir,
    config: PathBuf,
    store: SqliteStore,
}

impl Workspace {
    fn path(&self) -> &Path {
        self.dir.path()
    }
}

fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}")
}

fn workspace() -> Workspace {
    let dir = tempdir().expect("tempdir");
    let db = dir.path().join("engine.db");
    let store = SqliteStore::open(&db).expect("open store");
    store.ensure_schema().expect("schema");
    let config = dir.path().join("phasekeeper.yaml");
    fs::write(
        &config,
        format!(
            "store:\n  database: {}\napi:\n  base_url: {}\n  status_timeout_secs: 2\n\
             logging:\n  path: {}\n",
            db.display(),
            closed_port_url(),
            dir.path().join("logs/engine.log").display()
        ),
    )
    .expect("write config");
    Workspace { dir, config, store }
}

fn seed_workflow(store: &SqliteStore) {
    let workflow = WorkflowId::parse("wf-1").expect("id");
    store
        .insert_workflow(&WorkflowRecord {
            id: workflow.clone(),
            name: "checkout".to_string(),
            status: WorkflowStatus::Active,
        })
        .expect("workflow");
    let phase = PhaseId::parse("p-1").expect("id");
    store
        .insert_phase(&PhaseRecord {
            id: phase.clone(),
            workflow_id: workflow,
            order: 1,
            name: "build".to_string(),
        })
        .expect("phase");
    for (id, status) in [("t-1", TaskStatus::Done), ("t-2", TaskStatus::Done)] {
        store
            .insert_task(&TaskRecord::new(
                TaskId::parse(id).expect("id"),
                phase.clone(),
                status,
            ))
            .expect("task");
    }
}

fn cli(ws: &Workspace, args: &[&str]) -> Result<String, String> {
    let mut full: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    full.push("--config".to_string());
    full.push(ws.config.display().to_string());
    run_cli(full)
}

#[test]
fn status_from_store_reports_completed_phases_as_json() {
    let ws = workspace();
    seed_workflow(&ws.store);

    let output = cli(&ws, &["status", "--method", "db", "--json"]).expect("status");
    let report: Value = serde_json::from_str(&output).expect("json report");
    assert!(report["report_id"].as_str().expect("id").starts_with("rpt-"));
    let completion = &report["completion"];
    assert_eq!(completion["agreement"], "single_source");
    assert_eq!(completion["complete"], true);
    let source = &completion["sources"][0];
    assert_eq!(source["source"], "store");
    assert_eq!(source["state"], "evaluated");
    assert_eq!(source["verdict"]["reason"], "all_phases_complete");
    assert_eq!(source["verdict"]["progress"]["total_tasks"], 2);

    let log = fs::read_to_string(ws.path().join("logs/engine.log")).expect("log file");
    assert!(!log.trim().is_empty());
}

#[test]
fn status_keeps_store_verdict_when_api_is_down() {
    let ws = workspace();
    seed_workflow(&ws.store);

    let output = cli(&ws, &["status"]).expect("status");
    assert!(output.contains("[api]"));
    assert!(output.contains("unavailable"));
    assert!(output.contains("[store]"));
    assert!(output.contains("agreement: incomplete"));
}

#[test]
fn status_fails_when_the_only_source_is_down() {
    let ws = workspace();
    let err = cli(&ws, &["status", "--method", "api"]).expect_err("api down");
    assert!(err.contains("api"));
}

#[test]
fn recover_failed_without_execute_leaves_tasks_failed() {
    let ws = workspace();
    seed_workflow(&ws.store);
    let mut failed = TaskRecord::new(
        TaskId::parse("t-9").expect("id"),
        PhaseId::parse("p-1").expect("id"),
        TaskStatus::Failed,
    );
    failed.description = Some("compile assets".to_string());
    ws.store.insert_task(&failed).expect("task");

    let output = cli(&ws, &["recover", "failed"]).expect("recover");
    assert!(output.contains("1 failed task(s)"));
    assert!(output.contains("compile assets"));
    let task = ws
        .store
        .task(&TaskId::parse("t-9").expect("id"))
        .expect("read")
        .expect("task");
    assert_eq!(task.status, TaskStatus::Failed);

    let output = cli(&ws, &["recover", "failed", "--execute"]).expect("execute");
    assert!(output.contains("reset 1 task(s) to queued"));
    let task = ws
        .store
        .task(&TaskId::parse("t-9").expect("id"))
        .expect("read")
        .expect("task");
    assert_eq!(task.status, TaskStatus::Queued);
}

#[test]
fn recover_blocked_lists_dependencies() {
    let ws = workspace();
    let mut blocked = TaskRecord::new(
        TaskId::parse("t-5").expect("id"),
        PhaseId::parse("p-1").expect("id"),
        TaskStatus::Blocked,
    );
    blocked.blocked_by = vec![TaskId::parse("t-4").expect("id")];
    ws.store.insert_task(&blocked).expect("task");

    let output = cli(&ws, &["recover", "blocked", "--json"]).expect("blocked");
    let views: Value = serde_json::from_str(&output).expect("json");
    assert_eq!(views[0]["task_id"], "t-5");
    assert_eq!(views[0]["blocked_by"][0], "t-4");
}

#[test]
fn missing_database_is_reported() {
    let ws = workspace();
    fs::remove_file(ws.store.db_path()).expect("remove db");
    let err = cli(&ws, &["recover", "agents"]).expect_err("no database");
    assert!(err.contains("database does not exist"));
}

#[test]
fn unknown_commands_and_options_are_rejected() {
    let err = run_cli(vec!["frobnicate".to_string()]).expect_err("unknown");
    assert!(err.starts_with("unknown command `frobnicate`"));
    let err = run_cli(vec!["status".to_string(), "--execute".to_string()])
        .expect_err("status has no --execute");
    assert!(err.contains("--execute"));
    let err = run_cli(vec!["recover".to_string(), "everything".to_string()])
        .expect_err("unknown target");
    assert!(err.contains("unknown recover target"));
    assert!(run_cli(Vec::new()).expect("help").contains("status"));
}

#[test]
fn binary_exits_non_zero_on_errors() {
    let ws = workspace();
    let output = Command::new(env!("CARGO_BIN_EXE_phasekeeper"))
        .args(["status", "--method", "api", "--config"])
        .arg(&ws.config)
        .env_remove("PHASEKEEPER_API_URL")
        .env_remove("DATABASE_PATH")
        .output()
        .expect("run binary");
    assert!(!output.status.success());
    assert!(!output.stderr.is_empty());

    let output = Command::new(env!("CARGO_BIN_EXE_phasekeeper"))
        .arg("help")
        .output()
        .expect("run binary");
    assert!(output.status.success());
}
