//! Deterministic readiness and selection logic for the component graph.

use std::collections::BTreeSet;

use crate::plan::{Component, DevelopmentStatus, Plan};

/// True if every dependency names some component that is `Completed`.
///
/// A dependency that matches no component is never satisfied.
pub fn dependencies_met(plan: &Plan, component: &Component) -> bool {
    component.dependencies.iter().all(|dep| {
        plan.components
            .iter()
            .any(|c| c.name == *dep && c.status == DevelopmentStatus::Completed)
    })
}

/// True if the component is not `Completed` and all its dependencies are.
pub fn is_ready(plan: &Plan, component: &Component) -> bool {
    component.status != DevelopmentStatus::Completed && dependencies_met(plan, component)
}

/// Index of the first ready component in stored order, ignoring `excluded`
/// indices (components that already failed during the current run).
pub fn first_ready_index(plan: &Plan, excluded: &BTreeSet<usize>) -> Option<usize> {
    plan.components
        .iter()
        .enumerate()
        .find(|(index, component)| !excluded.contains(index) && is_ready(plan, component))
        .map(|(index, _)| index)
}

/// Names of unfinished components that are not ready, in stored order.
pub fn blocked_names(plan: &Plan) -> Vec<String> {
    plan.components
        .iter()
        .filter(|c| c.status != DevelopmentStatus::Completed && !dependencies_met(plan, c))
        .map(|c| c.name.clone())
        .collect()
}
