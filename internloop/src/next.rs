//! Selection helpers for `internloop next`.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};

use crate::core::selector::{blocked_names, first_ready_index};
use crate::io::plan_store::load_plan;
use crate::plan::Plan;

/// Structured selection outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextOutcome {
    /// Every component is `Completed`.
    Complete,
    /// Ready component selected.
    Ready(ReadyComponent),
    /// Unfinished components remain but none can start.
    Stalled { blocked: Vec<String> },
}

/// Minimal selected component metadata for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyComponent {
    pub name: String,
    pub position: usize,
    pub dependencies: Vec<String>,
}

/// Pick the component the scheduler would build next.
pub fn next_component(plan: &Plan) -> NextOutcome {
    if plan.is_complete() {
        return NextOutcome::Complete;
    }
    match first_ready_index(plan, &BTreeSet::new()) {
        Some(position) => {
            let component = &plan.components[position];
            NextOutcome::Ready(ReadyComponent {
                name: component.name.clone(),
                position,
                dependencies: component.dependencies.clone(),
            })
        }
        None => NextOutcome::Stalled {
            blocked: blocked_names(plan),
        },
    }
}

/// Load the plan from disk and select the next component.
pub fn next_from_path(plan_path: &Path) -> Result<NextOutcome> {
    let plan = load_plan(plan_path).context("load plan for selection")?;
    Ok(next_component(&plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{completed, component, plan_of};

    #[test]
    fn ready_component_is_reported_with_position() {
        let plan = plan_of(vec![component("ui", &["core"]), completed("core", &[])]);
        assert_eq!(
            next_component(&plan),
            NextOutcome::Ready(ReadyComponent {
                name: "ui".to_string(),
                position: 0,
                dependencies: vec!["core".to_string()],
            })
        );
    }

    #[test]
    fn empty_and_finished_plans_are_complete() {
        assert_eq!(next_component(&plan_of(Vec::new())), NextOutcome::Complete);
        let plan = plan_of(vec![completed("a", &[])]);
        assert_eq!(next_component(&plan), NextOutcome::Complete);
    }

    #[test]
    fn cycle_is_stalled() {
        let plan = plan_of(vec![component("a", &["b"]), component("b", &["a"])]);
        assert_eq!(
            next_component(&plan),
            NextOutcome::Stalled {
                blocked: vec!["a".to_string(), "b".to_string()]
            }
        );
    }

    #[test]
    fn missing_plan_file_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = next_from_path(&temp.path().join("plan.json")).unwrap_err();
        assert!(format!("{err:#}").contains("read plan"));
    }
}
