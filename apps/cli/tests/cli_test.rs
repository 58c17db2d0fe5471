//! Integration tests for the `ensemble` binary.

use assert_cmd::Command;
use ensemble_orchestrator::{
    AgentDescriptor, AgentRole, Message, PendingKind, PendingRequest, RunConfig, RunState, RunStatus,
    WorkflowStrategy,
};
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const TEAM: &str = r#"
[team]
strategy = "sequential"
initial_message = "Plan the launch"
team_name = "launch"
owner_id = "tester"
max_rounds = 1

[[team.agents]]
name = "a"
role = "generalist"

[[team.agents]]
name = "b"
role = "researcher"

[engine]
turn_timeout_seconds = 10
"#;

fn ensemble() -> Command {
    Command::cargo_bin("ensemble").unwrap()
}

fn write_team(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("team.toml");
    fs::write(&path, content).unwrap();
    path
}

fn json_stdout(output: &[u8]) -> Value {
    serde_json::from_slice(output).unwrap()
}

/// Snapshot of a sequential run where `a` asked the user a question.
fn write_suspended_snapshot(path: &Path) -> RunState {
    let config = RunConfig::new(
        "sequential",
        "Plan the launch",
        vec![AgentDescriptor::new("a", AgentRole::Generalist), AgentDescriptor::new("b", AgentRole::Generalist)],
    )
    .with_max_rounds(1);
    let mut state = RunState::new(config, WorkflowStrategy::Sequential);
    state.transition(RunStatus::Running).unwrap();
    state.round_order = vec!["a".to_string(), "b".to_string()];
    state.record(Message::agent("a", "What is the budget?"));
    state.turns = 1;
    state.enter_step(1);
    state.pending = Some(PendingRequest {
        agent: "a".to_string(),
        message: "What is the budget?".to_string(),
        kind: PendingKind::UserInput { form_schema: None },
    });
    state.transition(RunStatus::AwaitingUser).unwrap();
    fs::write(path, state.to_json().unwrap()).unwrap();
    state
}

#[test]
fn test_strategies_lists_every_strategy() {
    ensemble()
        .arg("strategies")
        .assert()
        .success()
        .stdout(predicate::str::contains("sequential"))
        .stdout(predicate::str::contains("reverse"))
        .stdout(predicate::str::contains("random"))
        .stdout(predicate::str::contains("llm_routed"))
        .stdout(predicate::str::contains("manager_directed"));
}

#[test]
fn test_validate_accepts_team() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_team(&temp_dir, TEAM);

    ensemble()
        .arg("validate")
        .arg("--config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"))
        .stdout(predicate::str::contains("a, b"));
}

#[test]
fn test_validate_rejects_duplicate_agents() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_team(&temp_dir, &TEAM.replace("name = \"b\"", "name = \"a\""));

    ensemble()
        .arg("validate")
        .arg("--config")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate agent name 'a'"));
}

#[test]
fn test_run_missing_config_fails() {
    ensemble()
        .arg("run")
        .arg("--config")
        .arg("does-not-exist.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read team configuration"));
}

#[test]
fn test_run_json_outcome() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_team(&temp_dir, TEAM);

    let output = ensemble().arg("run").arg("--config").arg(&path).arg("--json").output().unwrap();
    assert!(output.status.success());

    let outcome = json_stdout(&output.stdout);
    assert_eq!(outcome["status"], "completed");
    assert_eq!(outcome["strategy"], "sequential");
    assert_eq!(outcome["turns"], 2);
    assert_eq!(outcome["responses"][0]["agent"], "a");
    assert_eq!(outcome["responses"][0]["content"], "a considered: Plan the launch");
    assert_eq!(outcome["responses"][1]["content"], "b considered: a considered: Plan the launch");
}

#[test]
fn test_run_overrides_strategy_and_rounds() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_team(&temp_dir, TEAM);

    let output = ensemble()
        .arg("run")
        .arg("--config")
        .arg(&path)
        .args(["--strategy", "sequential_reverse", "--rounds", "2", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let outcome = json_stdout(&output.stdout);
    assert_eq!(outcome["strategy"], "reverse");
    assert_eq!(outcome["rounds"], 2);
    assert_eq!(outcome["turns"], 4);
    assert_eq!(outcome["responses"][0]["agent"], "b");
}

#[test]
fn test_run_manager_directed_team() {
    let temp_dir = TempDir::new().unwrap();
    let team = TEAM.replace("strategy = \"sequential\"", "strategy = \"hierarchical\"").replace(
        "name = \"a\"\nrole = \"generalist\"",
        "name = \"a\"\nrole = \"manager\"",
    );
    let path = write_team(&temp_dir, &team);

    let output = ensemble().arg("run").arg("--config").arg(&path).args(["--rounds", "3", "--json"]).output().unwrap();
    assert!(output.status.success());

    let outcome = json_stdout(&output.stdout);
    assert_eq!(outcome["status"], "completed");
    assert_eq!(outcome["strategy"], "manager_directed");
    let agents: Vec<_> =
        outcome["responses"].as_array().unwrap().iter().map(|r| r["agent"].as_str().unwrap().to_string()).collect();
    assert_eq!(agents, vec!["a", "b", "a"]);
}

#[test]
fn test_run_human_output() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_team(&temp_dir, TEAM);

    ensemble()
        .env("NO_COLOR", "1")
        .arg("run")
        .arg("--config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Round 1: a → b"))
        .stdout(predicate::str::contains("Status: completed"));
}

#[test]
fn test_resume_answers_suspended_run() {
    let temp_dir = TempDir::new().unwrap();
    let snapshot = temp_dir.path().join("run.json");
    write_suspended_snapshot(&snapshot);

    let output = ensemble()
        .arg("resume")
        .arg("--snapshot")
        .arg(&snapshot)
        .args(["--answer", "100", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let outcome = json_stdout(&output.stdout);
    assert_eq!(outcome["status"], "completed");
    assert_eq!(outcome["final_response"], "b considered: 100");

    // The snapshot now holds the finished run.
    let saved = RunState::from_json(&fs::read_to_string(&snapshot).unwrap()).unwrap();
    assert_eq!(saved.status, RunStatus::Completed);
    assert_eq!(saved.history.len(), 4);
    assert!(!snapshot.with_extension("json.tmp").exists());
}

#[test]
fn test_resume_requires_answer_for_user_input() {
    let temp_dir = TempDir::new().unwrap();
    let snapshot = temp_dir.path().join("run.json");
    write_suspended_snapshot(&snapshot);

    ensemble()
        .arg("resume")
        .arg("--snapshot")
        .arg(&snapshot)
        .assert()
        .failure()
        .stderr(predicate::str::contains("pass --answer"));
}

#[test]
fn test_resume_rejects_mismatched_input() {
    let temp_dir = TempDir::new().unwrap();
    let snapshot = temp_dir.path().join("run.json");
    write_suspended_snapshot(&snapshot);

    ensemble()
        .arg("resume")
        .arg("--snapshot")
        .arg(&snapshot)
        .arg("--credential-supplied")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be resumed"));
}
