//! Agent gateway abstraction.
//!
//! The [`Agent`] trait decouples the scheduler and verification loop from the
//! concrete backend (Cursor CLI, Copilot CLI). Tests use scripted agents that
//! return predetermined replies without spawning processes.

use std::path::PathBuf;

use crate::core::types::AgentReply;
use crate::io::config::{AgentKind, InternConfig};
use crate::io::copilot::CopilotAgent;
use crate::io::cursor::CursorAgent;

/// Parameters for one agent invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRequest {
    /// Project root the agent operates in.
    pub workdir: PathBuf,
    /// Natural-language instruction.
    pub prompt: String,
}

/// Abstraction over agent backends.
///
/// Every call resolves to exactly one terminal [`AgentReply`]; spawn errors,
/// timeouts and non-zero exits are reported as `success == false`, never as a
/// panic or a hang.
pub trait Agent {
    fn invoke(&self, request: &AgentRequest) -> AgentReply;
}

impl<A: Agent + ?Sized> Agent for &A {
    fn invoke(&self, request: &AgentRequest) -> AgentReply {
        (**self).invoke(request)
    }
}

impl<A: Agent + ?Sized> Agent for Box<A> {
    fn invoke(&self, request: &AgentRequest) -> AgentReply {
        (**self).invoke(request)
    }
}

/// Build the backend selected by `config.agent`.
pub fn agent_from_config(config: &InternConfig) -> Box<dyn Agent> {
    match config.agent {
        AgentKind::Cursor => Box::new(CursorAgent::from_config(config)),
        AgentKind::Copilot => Box::new(CopilotAgent::from_config(config)),
    }
}
