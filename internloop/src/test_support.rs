//! Test-only helpers: plan builders, a scripted agent, and a recording sink.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::types::{AgentReply, AttemptOutcome};
use crate::io::agent::{Agent, AgentRequest};
use crate::io::attempt_log::{AttemptRecord, AttemptSink};
use crate::io::paths::AiPaths;
use crate::io::plan_store::{load_plan, write_plan};
use crate::plan::{Component, DevelopmentStatus, Plan};

/// Create a `NotStarted` component with deterministic text fields.
pub fn component(name: &str, dependencies: &[&str]) -> Component {
    Component {
        name: name.to_string(),
        description: format!("{name} description"),
        detailed_design: format!("{name} design"),
        dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
        status: DevelopmentStatus::NotStarted,
    }
}

/// Create a `Completed` component.
pub fn completed(name: &str, dependencies: &[&str]) -> Component {
    Component {
        status: DevelopmentStatus::Completed,
        ..component(name, dependencies)
    }
}

/// Wrap components in a plan with a fixed description and one decision.
pub fn plan_of(components: Vec<Component>) -> Plan {
    Plan {
        application_description: "test application".to_string(),
        architectural_decisions: vec!["keep it simple".to_string()],
        components,
    }
}

/// Agent that replays queued replies in order and records every request.
///
/// Once the queue is empty every call fails like a dead backend would.
#[derive(Debug, Default)]
pub struct ScriptedAgent {
    replies: RefCell<VecDeque<AgentReply>>,
    requests: RefCell<Vec<AgentRequest>>,
}

impl ScriptedAgent {
    pub fn new(replies: Vec<AgentReply>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Agent that answers `OK` to the next `n` calls.
    pub fn always_ok(n: usize) -> Self {
        Self::new(vec![AgentReply::completed("OK"); n])
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }

    pub fn invocations(&self) -> usize {
        self.requests.borrow().len()
    }

    /// Replies not consumed yet.
    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

impl Agent for ScriptedAgent {
    fn invoke(&self, request: &AgentRequest) -> AgentReply {
        self.requests.borrow_mut().push(request.clone());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| AgentReply::failed("scripted agent exhausted"))
    }
}

/// Owned copy of an [`AttemptRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAttempt {
    pub label: String,
    pub attempt: u32,
    pub prompt: String,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub records: Vec<RecordedAttempt>,
}

impl AttemptSink for RecordingSink {
    fn record(&mut self, record: &AttemptRecord<'_>) {
        self.records.push(RecordedAttempt {
            label: record.label.to_string(),
            attempt: record.attempt,
            prompt: record.prompt.to_string(),
            outcome: record.outcome.clone(),
        });
    }
}

/// Temporary project root with an `.ai/` directory.
pub struct TestProject {
    dir: tempfile::TempDir,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn paths(&self) -> AiPaths {
        AiPaths::new(self.root())
    }

    pub fn plan_path(&self) -> PathBuf {
        self.paths().plan_path
    }

    pub fn write_plan(&self, plan: &Plan) -> Result<()> {
        write_plan(&self.plan_path(), plan)
    }

    pub fn read_plan(&self) -> Result<Plan> {
        load_plan(&self.plan_path())
    }
}
