//! Dependency-ordered component builds driven by an external coding agent.
//!
//! Reads `.ai/plan.json`, builds every ready component through the agent's
//! build-and-report protocol, and records progress back into the plan.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use internloop::build::{BuildEvent, BuildOutcome, run_build};
use internloop::create_plan::{PlanFileState, create_plan};
use internloop::exit_codes;
use internloop::io::agent::agent_from_config;
use internloop::io::attempt_log::AttemptLog;
use internloop::io::config::{AgentKind, load_config, switch_agent};
use internloop::io::paths::AiPaths;
use internloop::logging;
use internloop::next::{NextOutcome, next_from_path};
use internloop::validate::validate_plan_file;

#[derive(Parser)]
#[command(
    name = "internloop",
    version,
    about = "Build a planned application component by component with a coding agent"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build every ready component in dependency order.
    Build {
        /// Plan file, relative to the working directory.
        #[arg(long)]
        plan: Option<PathBuf>,
        /// Project root the agent works in (defaults to the current directory).
        #[arg(long)]
        workdir: Option<PathBuf>,
        /// Agent backend for this run, overriding `.ai/config.toml`.
        #[arg(long, value_enum)]
        agent: Option<AgentKind>,
    },
    /// Print the component that would be built next.
    Next {
        #[arg(long)]
        plan: Option<PathBuf>,
    },
    /// Check the plan against the schema and graph invariants.
    Validate {
        #[arg(long)]
        plan: Option<PathBuf>,
    },
    /// Ask the agent to write `.ai/plan.json` for a request.
    CreatePlan {
        /// What the application should do.
        #[arg(required = true, num_args = 1..)]
        request: Vec<String>,
        #[arg(long)]
        workdir: Option<PathBuf>,
    },
    /// Show the active agent, or persist a new one.
    SwitchAgent {
        /// `cursor` or `copilot`.
        name: Option<String>,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Build {
            plan,
            workdir,
            agent,
        } => cmd_build(plan.as_deref(), workdir, agent),
        Command::Next { plan } => cmd_next(plan.as_deref()),
        Command::Validate { plan } => cmd_validate(plan.as_deref()),
        Command::CreatePlan { request, workdir } => cmd_create_plan(&request.join(" "), workdir),
        Command::SwitchAgent { name } => cmd_switch_agent(name.as_deref()),
    }
}

fn project_paths(workdir: Option<PathBuf>) -> Result<AiPaths> {
    let root = match workdir {
        Some(dir) => dir,
        None => std::env::current_dir().context("resolve current directory")?,
    };
    Ok(AiPaths::new(root))
}

fn plan_path(paths: &AiPaths, plan: Option<&Path>) -> PathBuf {
    plan.map_or_else(|| paths.plan_path.clone(), |p| paths.resolve(p))
}

fn cmd_build(
    plan: Option<&Path>,
    workdir: Option<PathBuf>,
    agent: Option<AgentKind>,
) -> Result<i32> {
    let paths = project_paths(workdir)?;
    let plan_path = plan_path(&paths, plan);
    let mut config = load_config(&paths.config_path)?;
    if let Some(kind) = agent {
        config.agent = kind;
    }
    println!("build: plan={} agent={}", plan_path.display(), config.agent);

    let backend = agent_from_config(&config);
    let mut attempts = AttemptLog::for_new_run(&paths.attempts_dir);
    let outcome = run_build(&plan_path, &paths.root, &backend, &mut attempts, print_event)?;
    print_summary(&outcome);
    println!("build: attempts_dir={}", attempts.run_dir().display());
    Ok(exit_codes::OK)
}

fn print_event(event: &BuildEvent) {
    match event {
        BuildEvent::PlanPersisted => {}
        BuildEvent::BootstrapStarted => println!("build: bootstrap status=started"),
        BuildEvent::BootstrapFinished { success, detail } => {
            if *success {
                println!("build: bootstrap status=ok");
            } else {
                println!("build: bootstrap status=failed");
                print_detail(detail.as_deref());
            }
        }
        BuildEvent::ComponentStarted { name } => {
            println!("build: component={name} status=started");
        }
        BuildEvent::ComponentFinished {
            name,
            success,
            attempts,
            detail,
        } => {
            let status = if *success { "completed" } else { "failed" };
            println!("build: component={name} status={status} attempts={attempts}");
            if !success {
                print_detail(detail.as_deref());
            }
        }
    }
}

fn print_detail(detail: Option<&str>) {
    if let Some(detail) = detail {
        for line in detail.lines() {
            eprintln!("  | {line}");
        }
    }
}

fn print_summary(outcome: &BuildOutcome) {
    println!(
        "build: built={} failed={} remaining={}",
        outcome.built.len(),
        outcome.failed.len(),
        outcome.remaining.len()
    );
    if outcome.all_completed {
        println!("build: all components completed");
        return;
    }
    for name in &outcome.failed {
        eprintln!("warning: component '{name}' failed verification");
    }
    for name in &outcome.blocked {
        eprintln!("warning: component '{name}' is blocked by unfinished or unknown dependencies");
    }
}

fn cmd_next(plan: Option<&Path>) -> Result<i32> {
    let paths = project_paths(None)?;
    match next_from_path(&plan_path(&paths, plan))? {
        NextOutcome::Complete => {
            println!("complete");
            Ok(exit_codes::COMPLETE)
        }
        NextOutcome::Ready(component) => {
            println!("{}", component.name);
            Ok(exit_codes::OK)
        }
        NextOutcome::Stalled { blocked } => {
            eprintln!("stalled: {}", blocked.join(", "));
            Ok(exit_codes::STALLED)
        }
    }
}

fn cmd_validate(plan: Option<&Path>) -> Result<i32> {
    let paths = project_paths(None)?;
    let outcome = validate_plan_file(&plan_path(&paths, plan))?;
    println!(
        "validate: ok components={} completed={}",
        outcome.components, outcome.completed
    );
    Ok(exit_codes::OK)
}

fn cmd_create_plan(request: &str, workdir: Option<PathBuf>) -> Result<i32> {
    let paths = project_paths(workdir)?;
    let config = load_config(&paths.config_path)?;
    println!("create-plan: agent={}", config.agent);
    let backend = agent_from_config(&config);
    let outcome = create_plan(&paths, request, &backend)?;
    if !outcome.reply.is_empty() {
        println!("{}", outcome.reply);
    }
    match outcome.plan {
        PlanFileState::Written { components } => {
            println!(
                "create-plan: plan={} components={components}",
                paths.plan_path.display()
            );
        }
        PlanFileState::Missing => {
            eprintln!("warning: agent did not write {}", paths.plan_path.display());
        }
        PlanFileState::Unreadable { error } => {
            eprintln!("warning: {error}");
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_switch_agent(name: Option<&str>) -> Result<i32> {
    let paths = project_paths(None)?;
    let Some(name) = name else {
        let config = load_config(&paths.config_path)?;
        println!("agent={}", config.agent);
        let available: Vec<&str> = AgentKind::ALL.iter().map(|kind| kind.as_str()).collect();
        println!("available={}", available.join(","));
        return Ok(exit_codes::OK);
    };
    let Some(kind) = AgentKind::from_name(name) else {
        bail!(
            "unknown agent '{name}', expected one of: {}",
            AgentKind::ALL.map(AgentKind::as_str).join(", ")
        );
    };
    if switch_agent(&paths.config_path, kind)? {
        println!("agent={kind} (switched)");
    } else {
        println!("agent={kind} (unchanged)");
    }
    Ok(exit_codes::OK)
}
