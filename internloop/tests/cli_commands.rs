//! CLI tests for `build`, `validate`, and `switch-agent` that never reach a
//! real agent backend.

use std::fs;
use std::process::{Command, Output};

use internloop::exit_codes;
use internloop::io::config::{AgentKind, load_config};
use internloop::test_support::{TestProject, completed, component, plan_of};

fn internloop(project: &TestProject, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_internloop"))
        .current_dir(project.root())
        .args(args)
        .output()
        .expect("spawn internloop")
}

#[test]
fn build_with_no_components_succeeds() {
    let project = TestProject::new().expect("project");
    project.write_plan(&plan_of(Vec::new())).expect("write plan");

    let output = internloop(&project, &["build"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(String::from_utf8_lossy(&output.stdout).contains("all components completed"));
}

#[test]
fn build_with_finished_plan_does_not_invoke_agent() {
    let project = TestProject::new().expect("project");
    project
        .write_plan(&plan_of(vec![completed("a", &[]), completed("b", &["a"])]))
        .expect("write plan");

    let output = internloop(&project, &["build", "--agent", "copilot"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("agent=copilot"));
    assert!(stdout.contains("built=0 failed=0 remaining=0"));
}

#[test]
fn build_without_plan_is_invalid() {
    let project = TestProject::new().expect("project");
    let output = internloop(&project, &["build"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("read plan"));
}

#[test]
fn build_with_invalid_config_is_invalid() {
    let project = TestProject::new().expect("project");
    project.write_plan(&plan_of(Vec::new())).expect("write plan");
    fs::write(&project.paths().config_path, "agent_timeout_secs = 0\n").expect("write config");

    let output = internloop(&project, &["build"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
}

#[test]
fn validate_accepts_sound_plan() {
    let project = TestProject::new().expect("project");
    project
        .write_plan(&plan_of(vec![completed("a", &[]), component("b", &["a"])]))
        .expect("write plan");

    let output = internloop(&project, &["validate"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(String::from_utf8_lossy(&output.stdout).contains("components=2 completed=1"));
}

#[test]
fn validate_rejects_cycles() {
    let project = TestProject::new().expect("project");
    project
        .write_plan(&plan_of(vec![component("a", &["b"]), component("b", &["a"])]))
        .expect("write plan");

    let output = internloop(&project, &["validate"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("dependency cycle"));
}

#[test]
fn switch_agent_persists_choice() {
    let project = TestProject::new().expect("project");

    let output = internloop(&project, &["switch-agent", "Copilot"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let config = load_config(&project.paths().config_path).expect("load config");
    assert_eq!(config.agent, AgentKind::Copilot);

    let output = internloop(&project, &["switch-agent"]);
    assert!(String::from_utf8_lossy(&output.stdout).contains("agent=copilot"));
}

#[test]
fn switch_agent_rejects_unknown_name() {
    let project = TestProject::new().expect("project");
    let output = internloop(&project, &["switch-agent", "gemini"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(!project.paths().config_path.exists());
}
