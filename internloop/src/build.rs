//! Dependency-ordered build scheduling for `internloop build`.
//!
//! The scheduler repeatedly picks the first ready component in stored order,
//! runs it through the verification loop, persists the plan, and rescans from
//! the top, until no ready component is left. Components that cannot become
//! ready (cycles, unknown dependencies, failed dependencies) are reported, not
//! treated as errors.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::core::invariants::validate_plan;
use crate::core::selector::first_ready_index;
use crate::io::agent::Agent;
use crate::io::attempt_log::AttemptSink;
use crate::io::plan_store::{load_plan, write_plan};
use crate::io::prompt::PromptBuilder;
use crate::plan::{DevelopmentStatus, Plan};
use crate::verify::BuildVerifier;

pub const BOOTSTRAP_LABEL: &str = "bootstrap";

/// Progress notifications emitted while scheduling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    BootstrapStarted,
    BootstrapFinished {
        success: bool,
        detail: Option<String>,
    },
    ComponentStarted {
        name: String,
    },
    ComponentFinished {
        name: String,
        success: bool,
        attempts: u32,
        detail: Option<String>,
    },
    /// The full plan was written after a status transition.
    PlanPersisted,
}

/// Summary of a scheduler run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Every component is `Completed`.
    pub all_completed: bool,
    /// Result of the bootstrap step, if the plan was pristine.
    pub bootstrap: Option<bool>,
    /// Components completed during this run, in build order.
    pub built: Vec<String>,
    /// Components whose verification failed during this run.
    pub failed: Vec<String>,
    /// Components that never became ready.
    pub blocked: Vec<String>,
    /// All components not `Completed`, in stored order.
    pub remaining: Vec<String>,
}

pub struct Scheduler<'a, A: Agent + ?Sized> {
    verifier: BuildVerifier<'a, A>,
    prompts: &'a PromptBuilder,
}

impl<'a, A: Agent + ?Sized> Scheduler<'a, A> {
    pub fn new(agent: &'a A, prompts: &'a PromptBuilder, workdir: &Path) -> Self {
        Self {
            verifier: BuildVerifier::new(agent, prompts, workdir),
            prompts,
        }
    }

    /// Drive `plan` to a fixed point.
    ///
    /// `persist` receives the full plan after every status transition and must
    /// succeed before scheduling continues; its error aborts the run.
    pub fn run<P, F>(
        &self,
        plan: &mut Plan,
        sink: &mut dyn AttemptSink,
        mut persist: P,
        mut on_event: F,
    ) -> Result<BuildOutcome>
    where
        P: FnMut(&Plan) -> Result<()>,
        F: FnMut(&BuildEvent),
    {
        if plan.components.is_empty() {
            info!("plan has no components");
            return Ok(BuildOutcome {
                all_completed: true,
                ..BuildOutcome::default()
            });
        }

        let mut outcome = BuildOutcome::default();
        if plan.is_pristine() {
            outcome.bootstrap = Some(self.bootstrap(plan, sink, &mut on_event)?);
        }

        // Failed components stay unfinished; excluding them keeps every pass
        // making progress so the loop terminates.
        let mut failed_this_run = BTreeSet::new();
        while let Some(index) = first_ready_index(plan, &failed_this_run) {
            let name = plan.components[index].name.clone();
            info!(component = %name, "building component");
            on_event(&BuildEvent::ComponentStarted { name: name.clone() });

            if plan.components[index].status == DevelopmentStatus::NotStarted {
                plan.components[index].status = DevelopmentStatus::InProgress;
                persist(plan).with_context(|| format!("persist plan before building {name}"))?;
                on_event(&BuildEvent::PlanPersisted);
            }

            let prompt = self.prompts.component(plan, &plan.components[index])?;
            let verified = self.verifier.execute(&name, &prompt, sink)?;
            if verified.success {
                plan.components[index].status = DevelopmentStatus::Completed;
                outcome.built.push(name.clone());
            } else {
                warn!(component = %name, attempts = verified.attempts, "component build failed");
                failed_this_run.insert(index);
                outcome.failed.push(name.clone());
            }
            persist(plan).with_context(|| format!("persist plan after building {name}"))?;
            on_event(&BuildEvent::PlanPersisted);

            on_event(&BuildEvent::ComponentFinished {
                name,
                success: verified.success,
                attempts: verified.attempts,
                detail: verified.final_error,
            });
        }

        outcome.remaining = plan.unfinished_names();
        outcome.blocked = plan
            .components
            .iter()
            .enumerate()
            .filter(|(index, c)| {
                c.status != DevelopmentStatus::Completed && !failed_this_run.contains(index)
            })
            .map(|(_, c)| c.name.clone())
            .collect();
        outcome.all_completed = outcome.remaining.is_empty();
        if outcome.all_completed {
            info!(built = outcome.built.len(), "all components built");
        } else {
            warn!(
                remaining = ?outcome.remaining,
                blocked = ?outcome.blocked,
                "some components could not be built"
            );
        }
        Ok(outcome)
    }

    fn bootstrap<F: FnMut(&BuildEvent)>(
        &self,
        plan: &Plan,
        sink: &mut dyn AttemptSink,
        on_event: &mut F,
    ) -> Result<bool> {
        info!("plan is pristine, creating empty project");
        on_event(&BuildEvent::BootstrapStarted);
        let prompt = self.prompts.bootstrap(plan)?;
        let verified = self.verifier.execute(BOOTSTRAP_LABEL, &prompt, sink)?;
        if !verified.success {
            warn!(attempts = verified.attempts, "empty project bootstrap failed");
        }
        on_event(&BuildEvent::BootstrapFinished {
            success: verified.success,
            detail: verified.final_error,
        });
        Ok(verified.success)
    }
}

/// Load the plan at `plan_path`, schedule it, and persist every transition.
///
/// Plan read/parse errors abort before anything is written. Invariant
/// violations are logged but do not stop the run; affected components stall.
pub fn run_build<A, F>(
    plan_path: &Path,
    workdir: &Path,
    agent: &A,
    sink: &mut dyn AttemptSink,
    on_event: F,
) -> Result<BuildOutcome>
where
    A: Agent + ?Sized,
    F: FnMut(&BuildEvent),
{
    let mut plan = load_plan(plan_path)?;
    for violation in validate_plan(&plan) {
        warn!(%violation, "plan invariant violated");
    }

    let prompts = PromptBuilder::new();
    let scheduler = Scheduler::new(agent, &prompts, workdir);
    scheduler.run(&mut plan, sink, |plan| write_plan(plan_path, plan), on_event)
}
