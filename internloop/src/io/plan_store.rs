//! Plan load/save helpers.
//!
//! Reading is lenient: object keys are matched case-insensitively and missing
//! fields default to empty values. Writing always produces the canonical
//! lower-snake layout and replaces the file atomically.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::debug;

use crate::plan::Plan;

/// Load and decode the plan document at `path`.
pub fn load_plan(path: &Path) -> Result<Plan> {
    debug!(path = %path.display(), "loading plan");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read plan {}", path.display()))?;
    let plan = parse_plan(&contents).with_context(|| format!("parse plan {}", path.display()))?;
    debug!(components = plan.components.len(), "plan loaded");
    Ok(plan)
}

/// Decode a plan document from JSON text.
pub fn parse_plan(raw: &str) -> Result<Plan> {
    let value = parse_plan_value(raw)?;
    let plan = serde_json::from_value(value).context("decode plan")?;
    Ok(plan)
}

/// Parse JSON text and lowercase every object key.
pub fn parse_plan_value(raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw).context("parse plan json")?;
    Ok(lowercase_keys(value))
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key.to_lowercase(), lowercase_keys(value)))
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

/// Atomically write the whole plan to disk (temp file + rename).
pub fn write_plan(path: &Path, plan: &Plan) -> Result<()> {
    debug!(path = %path.display(), components = plan.components.len(), "writing plan");
    let mut buf = serde_json::to_string_pretty(plan).context("serialize plan")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("plan path missing parent {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp plan {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace plan {}", path.display()))?;
    Ok(())
}
