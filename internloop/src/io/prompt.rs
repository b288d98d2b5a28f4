//! Instruction templates sent to the agent.

use anyhow::Result;
use minijinja::{Environment, context};
use serde::Serialize;
use tracing::debug;

use crate::plan::{Component, Plan};

const BOOTSTRAP_TEMPLATE: &str = include_str!("prompts/bootstrap.md");
const COMPONENT_TEMPLATE: &str = include_str!("prompts/component.md");
const FIX_TEMPLATE: &str = include_str!("prompts/fix.md");
const CREATE_PLAN_TEMPLATE: &str = include_str!("prompts/create_plan.md");

/// Upper bound on the build output quoted back in a fix prompt.
///
/// Prompts travel as a single argv element for some backends, and Linux caps
/// one argument at 128 KiB.
pub const MAX_FIX_DETAIL_BYTES: usize = 64 * 1024;

/// Component fields exposed to templates.
#[derive(Debug, Clone, Serialize)]
struct ComponentContext<'a> {
    name: &'a str,
    description: &'a str,
    detailed_design: &'a str,
    dependencies: &'a [String],
}

impl<'a> ComponentContext<'a> {
    fn from_component(component: &'a Component) -> Self {
        Self {
            name: component.name.trim(),
            description: component.description.trim(),
            detailed_design: component.detailed_design.trim(),
            dependencies: &component.dependencies,
        }
    }
}

/// Template engine wrapper around minijinja.
pub struct PromptBuilder {
    env: Environment<'static>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("bootstrap", BOOTSTRAP_TEMPLATE)
            .expect("bootstrap template should be valid");
        env.add_template("component", COMPONENT_TEMPLATE)
            .expect("component template should be valid");
        env.add_template("fix", FIX_TEMPLATE)
            .expect("fix template should be valid");
        env.add_template("create_plan", CREATE_PLAN_TEMPLATE)
            .expect("create_plan template should be valid");
        Self { env }
    }

    /// Instruction for the one-time empty project build.
    pub fn bootstrap(&self, plan: &Plan) -> Result<String> {
        let rendered = self.env.get_template("bootstrap")?.render(context! {
            decisions => &plan.architectural_decisions,
            description => plan.application_description.trim(),
        })?;
        debug!(bytes = rendered.len(), "rendered bootstrap prompt");
        Ok(rendered)
    }

    /// Instruction for building one component of the plan.
    pub fn component(&self, plan: &Plan, component: &Component) -> Result<String> {
        let rendered = self.env.get_template("component")?.render(context! {
            decisions => &plan.architectural_decisions,
            component => ComponentContext::from_component(component),
        })?;
        debug!(component = %component.name, bytes = rendered.len(), "rendered component prompt");
        Ok(rendered)
    }

    /// Corrective follow-up quoting the previous failure back to the agent.
    pub fn fix(&self, detail: &str) -> Result<String> {
        let rendered = self
            .env
            .get_template("fix")?
            .render(context! { detail => clip_detail(detail.trim(), MAX_FIX_DETAIL_BYTES) })?;
        Ok(rendered)
    }

    /// Instruction asking the agent to write a new plan document.
    pub fn create_plan(&self, request: &str, plan_path: &str) -> Result<String> {
        let rendered = self.env.get_template("create_plan")?.render(context! {
            request => request.trim(),
            plan_path => plan_path,
        })?;
        Ok(rendered)
    }
}

/// Keep the head and tail of `detail` within `limit` bytes, marking the cut.
fn clip_detail(detail: &str, limit: usize) -> String {
    if detail.len() <= limit {
        return detail.to_string();
    }
    let mut head_end = limit / 2;
    while !detail.is_char_boundary(head_end) {
        head_end -= 1;
    }
    let mut tail_start = detail.len() - limit / 2;
    while !detail.is_char_boundary(tail_start) {
        tail_start += 1;
    }
    let omitted = tail_start - head_end;
    debug!(omitted, "clipping build output in fix prompt");
    format!(
        "{}\n[... {omitted} bytes of build output omitted ...]\n{}",
        &detail[..head_end],
        &detail[tail_start..]
    )
}
