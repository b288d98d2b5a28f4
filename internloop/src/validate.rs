//! Strict plan validation for `internloop validate`.
//!
//! `build` reads plans leniently and lets broken components stall; this check
//! is the eager counterpart: schema conformance, decoding, then graph
//! invariants, all reported at once.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::validator_for;
use serde_json::Value;

use crate::core::invariants::validate_plan;
use crate::io::plan_store::parse_plan_value;
use crate::plan::Plan;

const PLAN_SCHEMA: &str = include_str!("../schemas/plan.schema.json");

/// Summary of a valid plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateOutcome {
    pub components: usize,
    pub completed: usize,
}

/// Validate the plan document at `path`.
pub fn validate_plan_file(path: &Path) -> Result<ValidateOutcome> {
    let raw = fs::read_to_string(path).with_context(|| format!("read plan {}", path.display()))?;
    let plan =
        validate_plan_document(&raw).with_context(|| format!("validate plan {}", path.display()))?;
    Ok(ValidateOutcome {
        components: plan.components.len(),
        completed: plan.components.len() - plan.unfinished_names().len(),
    })
}

/// Parse and validate plan text: schema conformance + graph invariants.
pub fn validate_plan_document(raw: &str) -> Result<Plan> {
    let value = parse_plan_value(raw)?;
    validate_schema(&value)?;
    let plan: Plan = serde_json::from_value(value).context("decode plan")?;
    let errors = validate_plan(&plan);
    if !errors.is_empty() {
        bail!("invariant violations:\n- {}", errors.join("\n- "));
    }
    Ok(plan)
}

fn validate_schema(instance: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(PLAN_SCHEMA).context("parse plan schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("schema validation failed:\n- {}", messages.join("\n- "));
    }
    Ok(())
}
