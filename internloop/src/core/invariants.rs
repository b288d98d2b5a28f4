//! Semantic plan checks not expressible via JSON Schema.
//!
//! The scheduler tolerates every violation reported here (it simply stalls);
//! these checks back the eager `validate` command and build-time warnings.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::plan::Plan;

/// Check plan invariants:
/// - component names are non-empty and unique
/// - dependencies name existing components other than the component itself
/// - the dependency graph is acyclic
pub fn validate_plan(plan: &Plan) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    for (index, component) in plan.components.iter().enumerate() {
        if component.name.trim().is_empty() {
            errors.push(format!("components[{index}]: component_name must be non-empty"));
            continue;
        }
        if !seen.insert(component.name.as_str()) {
            errors.push(format!(
                "components[{index}]: duplicate component_name '{}'",
                component.name
            ));
        }
    }

    for component in &plan.components {
        for dep in &component.dependencies {
            if *dep == component.name {
                errors.push(format!("{}: depends on itself", component.name));
            } else if !seen.contains(dep.as_str()) {
                errors.push(format!(
                    "{}: unknown dependency '{}'",
                    component.name, dep
                ));
            }
        }
    }

    for cycle in find_cycles(plan) {
        errors.push(format!("dependency cycle: {}", cycle.join(" -> ")));
    }
    errors
}

/// Find dependency cycles (self-dependencies excluded; reported separately).
///
/// Each cycle is listed once, starting from its first member in stored order
/// and closed by repeating that member.
fn find_cycles(plan: &Plan) -> Vec<Vec<String>> {
    let graph: BTreeMap<&str, Vec<&str>> = plan
        .components
        .iter()
        .map(|c| {
            let deps = c
                .dependencies
                .iter()
                .map(String::as_str)
                .filter(|dep| *dep != c.name)
                .collect();
            (c.name.as_str(), deps)
        })
        .collect();

    let mut cycles = Vec::new();
    let mut reported: BTreeSet<BTreeSet<&str>> = BTreeSet::new();
    let mut done: HashSet<&str> = HashSet::new();
    for component in &plan.components {
        let mut stack = Vec::new();
        visit(
            component.name.as_str(),
            &graph,
            &mut stack,
            &mut done,
            &mut reported,
            &mut cycles,
        );
    }
    cycles
}

fn visit<'a>(
    name: &'a str,
    graph: &BTreeMap<&'a str, Vec<&'a str>>,
    stack: &mut Vec<&'a str>,
    done: &mut HashSet<&'a str>,
    reported: &mut BTreeSet<BTreeSet<&'a str>>,
    cycles: &mut Vec<Vec<String>>,
) {
    if done.contains(name) {
        return;
    }
    if let Some(start) = stack.iter().position(|entry| *entry == name) {
        let members: BTreeSet<&str> = stack[start..].iter().copied().collect();
        if reported.insert(members) {
            let mut cycle: Vec<String> = stack[start..].iter().map(|s| s.to_string()).collect();
            cycle.push(name.to_string());
            cycles.push(cycle);
        }
        return;
    }
    let Some(deps) = graph.get(name) else {
        return;
    };
    stack.push(name);
    for dep in deps {
        visit(*dep, graph, stack, done, reported, cycles);
    }
    stack.pop();
    done.insert(name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{component, plan_of};

    #[test]
    fn valid_plan_has_no_errors() {
        let plan = plan_of(vec![
            component("core", &[]),
            component("api", &["core"]),
            component("ui", &["api", "core"]),
        ]);
        assert!(validate_plan(&plan).is_empty());
    }

    #[test]
    fn reports_duplicates_and_empty_names() {
        let plan = plan_of(vec![
            component("core", &[]),
            component("core", &[]),
            component(" ", &[]),
        ]);
        let errors = validate_plan(&plan);
        assert!(errors.iter().any(|e| e.contains("duplicate component_name 'core'")));
        assert!(errors.iter().any(|e| e.contains("must be non-empty")));
    }

    #[test]
    fn reports_unknown_and_self_dependencies() {
        let plan = plan_of(vec![component("a", &["a", "ghost"])]);
        let errors = validate_plan(&plan);
        assert!(errors.iter().any(|e| e == "a: depends on itself"));
        assert!(errors.iter().any(|e| e == "a: unknown dependency 'ghost'"));
    }

    #[test]
    fn reports_each_cycle_once() {
        let plan = plan_of(vec![
            component("a", &["b"]),
            component("b", &["c"]),
            component("c", &["a"]),
            component("d", &["a"]),
        ]);
        let errors = validate_plan(&plan);
        let cycles: Vec<&String> = errors
            .iter()
            .filter(|e| e.starts_with("dependency cycle"))
            .collect();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0], "dependency cycle: a -> b -> c -> a");
    }
}
