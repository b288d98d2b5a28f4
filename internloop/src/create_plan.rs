//! Plan authoring through the agent for `internloop create-plan`.

use std::fs;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::io::agent::{Agent, AgentRequest};
use crate::io::paths::{AI_DIR, AiPaths};
use crate::io::plan_store::load_plan;
use crate::io::prompt::PromptBuilder;

/// State of the plan file after the agent finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanFileState {
    Written { components: usize },
    Missing,
    Unreadable { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePlanOutcome {
    /// Agent reply text, for display.
    pub reply: String,
    pub plan: PlanFileState,
}

/// Ask the agent to write `.ai/plan.json` for `request` under `paths.root`.
///
/// A gateway failure is an error; a missing or unreadable plan file is
/// reported in the outcome so the caller can show the agent's reply.
pub fn create_plan<A: Agent + ?Sized>(
    paths: &AiPaths,
    request: &str,
    agent: &A,
) -> Result<CreatePlanOutcome> {
    if request.trim().is_empty() {
        bail!("plan request must not be empty");
    }
    fs::create_dir_all(&paths.ai_dir)
        .with_context(|| format!("create {}", paths.ai_dir.display()))?;

    let relative_plan = format!("{AI_DIR}/plan.json");
    let prompt = PromptBuilder::new().create_plan(request, &relative_plan)?;
    info!(plan = %relative_plan, "asking agent to create plan");
    let reply = agent.invoke(&AgentRequest {
        workdir: paths.root.clone(),
        prompt,
    });
    if !reply.success {
        bail!("plan creation failed: {}", reply.transport_failure_message());
    }

    let plan = if !paths.plan_path.exists() {
        warn!(path = %paths.plan_path.display(), "agent did not write a plan");
        PlanFileState::Missing
    } else {
        match load_plan(&paths.plan_path) {
            Ok(plan) => PlanFileState::Written {
                components: plan.components.len(),
            },
            Err(err) => {
                warn!(error = %format!("{err:#}"), "plan written by agent is unreadable");
                PlanFileState::Unreadable {
                    error: format!("{err:#}"),
                }
            }
        }
    };
    Ok(CreatePlanOutcome {
        reply: reply.combined_text(),
        plan,
    })
}
