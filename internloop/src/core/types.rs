//! Shared deterministic types for the build core.
//!
//! These types define stable contracts between the agent gateway, the
//! verification loop, and the scheduler. They carry no I/O.

use serde::{Deserialize, Serialize};

/// Terminal result of one agent invocation, as reported by a backend.
///
/// `success == false` means the gateway itself failed (spawn error, timeout,
/// non-zero exit, unreadable response). Build failures are reported through
/// the reply text with `success == true`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReply {
    pub success: bool,
    pub output: Option<String>,
    pub error_output: Option<String>,
    pub exit_code: i32,
    pub error_message: Option<String>,
}

impl AgentReply {
    /// Successful invocation with `output` as the primary reply text.
    pub fn completed(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            ..Self::default()
        }
    }

    /// Gateway failure with a human-readable message and no output.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: -1,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Primary and error-channel output joined by newlines, blank parts dropped.
    pub fn combined_text(&self) -> String {
        [self.output.as_deref(), self.error_output.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Message describing why the gateway call failed.
    pub fn transport_failure_message(&self) -> String {
        match self.error_message.as_deref() {
            Some(message) if !message.trim().is_empty() => message.to_string(),
            _ => format!("agent exited with code {}", self.exit_code),
        }
    }
}

/// Classification of an agent's reply under the `OK` / `ERROR:` protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "lowercase")]
pub enum BuildVerdict {
    Success,
    Failure { detail: String },
}

impl BuildVerdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// What happened on a single verification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The gateway failed; the loop stops without retrying.
    TransportFailure { message: String },
    /// The agent replied and the reply was classified.
    Classified { verdict: BuildVerdict },
}
