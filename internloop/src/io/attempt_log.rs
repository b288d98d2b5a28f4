//! Per-attempt artifacts under `.ai/attempts/<run-id>/<seq>/`.
//!
//! Tracing events are the primary observability channel; these files keep
//! enough on disk to reconstruct why a component stalled after the fact.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::warn;

use crate::core::types::{AgentReply, AttemptOutcome};

/// One verification attempt, as seen by an [`AttemptSink`].
#[derive(Debug, Clone, Copy)]
pub struct AttemptRecord<'a> {
    /// Component name, or `bootstrap`.
    pub label: &'a str,
    /// 1-indexed attempt number within the verification loop.
    pub attempt: u32,
    pub max_attempts: u32,
    pub prompt: &'a str,
    pub reply: &'a AgentReply,
    pub outcome: &'a AttemptOutcome,
}

/// Receiver for every verification attempt, regardless of outcome.
pub trait AttemptSink {
    fn record(&mut self, record: &AttemptRecord<'_>);
}

/// Sink that drops records (tracing still sees every attempt).
#[derive(Debug, Default)]
pub struct DiscardAttempts;

impl AttemptSink for DiscardAttempts {
    fn record(&mut self, _record: &AttemptRecord<'_>) {}
}

#[derive(Debug, Serialize)]
struct AttemptMeta<'a> {
    run_id: &'a str,
    seq: u32,
    label: &'a str,
    attempt: u32,
    max_attempts: u32,
    success: bool,
    exit_code: i32,
    error_message: Option<&'a str>,
    /// The agent reported a passing build on this attempt.
    build_ok: bool,
    #[serde(flatten)]
    outcome: &'a AttemptOutcome,
}

/// Writes `prompt.md`, `reply.log` and `meta.json` for each attempt.
#[derive(Debug)]
pub struct AttemptLog {
    run_id: String,
    run_dir: PathBuf,
    next_seq: u32,
}

impl AttemptLog {
    pub fn new(attempts_dir: &Path, run_id: impl Into<String>) -> Self {
        let run_id = run_id.into();
        Self {
            run_dir: attempts_dir.join(&run_id),
            run_id,
            next_seq: 1,
        }
    }

    /// Log keyed by wall-clock seconds and pid, unique per process start.
    pub fn for_new_run(attempts_dir: &Path) -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self::new(attempts_dir, format!("{secs}-{}", std::process::id()))
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    fn write(&mut self, record: &AttemptRecord<'_>) -> Result<PathBuf> {
        let seq = self.next_seq;
        self.next_seq += 1;
        let dir = self.run_dir.join(seq.to_string());
        fs::create_dir_all(&dir).with_context(|| format!("create attempt dir {}", dir.display()))?;

        write_text(&dir.join("prompt.md"), record.prompt)?;
        write_text(&dir.join("reply.log"), &render_reply(record.reply))?;

        let meta = AttemptMeta {
            run_id: &self.run_id,
            seq,
            label: record.label,
            attempt: record.attempt,
            max_attempts: record.max_attempts,
            success: record.reply.success,
            exit_code: record.reply.exit_code,
            error_message: record.reply.error_message.as_deref(),
            build_ok: matches!(
                record.outcome,
                AttemptOutcome::Classified { verdict } if verdict.is_success()
            ),
            outcome: record.outcome,
        };
        let mut buf = serde_json::to_string_pretty(&meta)?;
        buf.push('\n');
        write_text(&dir.join("meta.json"), &buf)?;
        Ok(dir)
    }
}

impl AttemptSink for AttemptLog {
    fn record(&mut self, record: &AttemptRecord<'_>) {
        if let Err(err) = self.write(record) {
            warn!(
                label = record.label,
                attempt = record.attempt,
                err = %format!("{err:#}"),
                "failed to write attempt log"
            );
        }
    }
}

fn render_reply(reply: &AgentReply) -> String {
    let mut buf = String::new();
    buf.push_str("=== output ===\n");
    buf.push_str(reply.output.as_deref().unwrap_or_default());
    buf.push_str("\n=== error output ===\n");
    buf.push_str(reply.error_output.as_deref().unwrap_or_default());
    buf.push('\n');
    buf
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}
