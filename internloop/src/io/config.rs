//! Configuration stored under `.ai/config.toml`.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Agent backend used for every invocation of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    #[default]
    Cursor,
    Copilot,
}

impl AgentKind {
    pub const ALL: [AgentKind; 2] = [AgentKind::Cursor, AgentKind::Copilot];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cursor => "cursor",
            Self::Copilot => "copilot",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration (TOML).
///
/// Edited by humans and by `switch-agent`. Missing fields default to values
/// that work with a stock Cursor CLI install.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InternConfig {
    /// Active agent backend.
    pub agent: AgentKind,

    /// Model override passed to the backend, if any.
    pub model: Option<String>,

    /// Wall-clock budget for a single agent invocation.
    pub agent_timeout_secs: u64,

    /// Cap on captured stdout/stderr per invocation.
    pub output_limit_bytes: usize,

    pub cursor: BackendConfig,
    pub copilot: BackendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    /// Executable to spawn (looked up on `PATH` unless absolute).
    pub command: String,
}

impl Default for InternConfig {
    fn default() -> Self {
        Self {
            agent: AgentKind::Cursor,
            model: None,
            agent_timeout_secs: 5 * 60,
            output_limit_bytes: 1_000_000,
            cursor: BackendConfig {
                command: "agent".to_string(),
            },
            copilot: BackendConfig {
                command: "copilot".to_string(),
            },
        }
    }
}

impl InternConfig {
    pub fn validate(&self) -> Result<()> {
        if self.agent_timeout_secs == 0 {
            return Err(anyhow!("agent_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.cursor.command.trim().is_empty() {
            return Err(anyhow!("cursor.command must be non-empty"));
        }
        if self.copilot.command.trim().is_empty() {
            return Err(anyhow!("copilot.command must be non-empty"));
        }
        Ok(())
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `InternConfig::default()`.
pub fn load_config(path: &Path) -> Result<InternConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = InternConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: InternConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &InternConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

/// Persist `kind` as the active agent. Returns `false` if it already was.
pub fn switch_agent(path: &Path, kind: AgentKind) -> Result<bool> {
    let mut cfg = load_config(path)?;
    if cfg.agent == kind {
        return Ok(false);
    }
    cfg.agent = kind;
    write_config(path, &cfg)?;
    Ok(true)
}
