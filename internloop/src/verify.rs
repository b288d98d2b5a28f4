//! Bounded-retry build verification around agent invocations.
//!
//! Each instruction is sent with a protocol suffix asking the agent to build
//! the project and answer `OK` or `ERROR: <output>`. Failed builds are fed back
//! as corrective instructions up to [`MAX_ATTEMPTS`] times; a gateway failure
//! ends the loop immediately.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::classifier::classify_build_reply;
use crate::core::types::{AttemptOutcome, BuildVerdict};
use crate::io::agent::{Agent, AgentRequest};
use crate::io::attempt_log::{AttemptRecord, AttemptSink};
use crate::io::prompt::PromptBuilder;

/// Total agent invocations allowed for one verification.
pub const MAX_ATTEMPTS: u32 = 5;

pub const BUILD_VERIFICATION_SUFFIX: &str = "\
After implementing, if this project is buildable (e.g. has a Cargo.toml, .csproj, package.json, or similar), run the appropriate build command. If the build succeeds, respond with exactly: OK
If the build fails, respond with exactly: ERROR:
followed by the complete build output (stdout and stderr). If the project is not buildable, respond with: OK";

/// Result of one verification loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub success: bool,
    /// Last failure detail (build output or gateway message) when unsuccessful.
    pub final_error: Option<String>,
    /// Agent invocations made, `1..=MAX_ATTEMPTS`.
    pub attempts: u32,
}

/// Append the reply protocol to an instruction.
pub fn with_protocol_suffix(instruction: &str) -> String {
    format!("{}\n\n{}", instruction.trim_end(), BUILD_VERIFICATION_SUFFIX)
}

/// Drives one agent through the verification protocol in a fixed project root.
pub struct BuildVerifier<'a, A: Agent + ?Sized> {
    agent: &'a A,
    prompts: &'a PromptBuilder,
    workdir: PathBuf,
}

impl<'a, A: Agent + ?Sized> BuildVerifier<'a, A> {
    pub fn new(agent: &'a A, prompts: &'a PromptBuilder, workdir: &Path) -> Self {
        Self {
            agent,
            prompts,
            workdir: workdir.to_path_buf(),
        }
    }

    /// Run `instruction` until the agent reports a successful build, the
    /// gateway fails, or [`MAX_ATTEMPTS`] invocations have been made.
    ///
    /// Errors only when a corrective prompt cannot be rendered.
    #[instrument(skip_all, fields(label = %label))]
    pub fn execute(
        &self,
        label: &str,
        instruction: &str,
        sink: &mut dyn AttemptSink,
    ) -> Result<VerifyOutcome> {
        let mut instruction = instruction.to_string();
        let mut last_error = None;

        for attempt in 1..=MAX_ATTEMPTS {
            let prompt = with_protocol_suffix(&instruction);
            info!(label, attempt, max_attempts = MAX_ATTEMPTS, "sending instruction to agent");
            let reply = self.agent.invoke(&AgentRequest {
                workdir: self.workdir.clone(),
                prompt: prompt.clone(),
            });

            if !reply.success {
                let message = reply.transport_failure_message();
                warn!(
                    label,
                    attempt,
                    exit_code = reply.exit_code,
                    %message,
                    "agent invocation failed"
                );
                let outcome = AttemptOutcome::TransportFailure {
                    message: message.clone(),
                };
                sink.record(&AttemptRecord {
                    label,
                    attempt,
                    max_attempts: MAX_ATTEMPTS,
                    prompt: &prompt,
                    reply: &reply,
                    outcome: &outcome,
                });
                return Ok(VerifyOutcome {
                    success: false,
                    final_error: Some(message),
                    attempts: attempt,
                });
            }

            let verdict = classify_build_reply(&reply.combined_text());
            let outcome = AttemptOutcome::Classified {
                verdict: verdict.clone(),
            };
            sink.record(&AttemptRecord {
                label,
                attempt,
                max_attempts: MAX_ATTEMPTS,
                prompt: &prompt,
                reply: &reply,
                outcome: &outcome,
            });

            match verdict {
                BuildVerdict::Success => {
                    info!(label, attempt, "build OK");
                    return Ok(VerifyOutcome {
                        success: true,
                        final_error: None,
                        attempts: attempt,
                    });
                }
                BuildVerdict::Failure { detail } => {
                    warn!(label, attempt, max_attempts = MAX_ATTEMPTS, "build failed");
                    if attempt < MAX_ATTEMPTS {
                        instruction = self.prompts.fix(&detail)?;
                    }
                    last_error = Some(detail);
                }
            }
        }

        warn!(label, attempts = MAX_ATTEMPTS, "build still failing, giving up");
        Ok(VerifyOutcome {
            success: false,
            final_error: last_error,
            attempts: MAX_ATTEMPTS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AgentReply;
    use crate::test_support::{RecordingSink, ScriptedAgent};

    fn run(agent: &ScriptedAgent, sink: &mut RecordingSink) -> VerifyOutcome {
        let temp = tempfile::tempdir().expect("tempdir");
        let prompts = PromptBuilder::new();
        BuildVerifier::new(agent, &prompts, temp.path())
            .execute("store", "build the store", sink)
            .expect("execute")
    }

    #[test]
    fn ok_on_first_attempt_succeeds() {
        let agent = ScriptedAgent::new(vec![AgentReply::completed("OK")]);
        let mut sink = RecordingSink::default();

        let outcome = run(&agent, &mut sink);
        assert_eq!(
            outcome,
            VerifyOutcome {
                success: true,
                final_error: None,
                attempts: 1
            }
        );
        let prompts = agent.prompts();
        assert!(prompts[0].starts_with("build the store"));
        assert!(prompts[0].ends_with(BUILD_VERIFICATION_SUFFIX));
        assert_eq!(sink.records.len(), 1);
    }

    #[test]
    fn failure_is_quoted_back_then_fixed() {
        let agent = ScriptedAgent::new(vec![
            AgentReply::completed("ERROR: missing semicolon"),
            AgentReply::completed("OK"),
        ]);
        let mut sink = RecordingSink::default();

        let outcome = run(&agent, &mut sink);
        assert!(outcome.success);
        assert_eq!(outcome.attempts, 2);

        let prompts = agent.prompts();
        assert!(
            prompts[1].contains("The build failed with the following output:\nmissing semicolon")
        );
        assert!(prompts[1].ends_with(BUILD_VERIFICATION_SUFFIX));
    }

    #[test]
    fn gives_up_after_five_failures() {
        let agent = ScriptedAgent::new(
            (1..=7)
                .map(|n| AgentReply::completed(format!("ERROR: failure {n}")))
                .collect(),
        );
        let mut sink = RecordingSink::default();

        let outcome = run(&agent, &mut sink);
        assert_eq!(
            outcome,
            VerifyOutcome {
                success: false,
                final_error: Some("failure 5".to_string()),
                attempts: MAX_ATTEMPTS
            }
        );
        assert_eq!(agent.invocations(), 5);
        assert_eq!(sink.records.len(), 5);
    }

    #[test]
    fn malformed_reply_counts_as_failure() {
        let agent = ScriptedAgent::new(vec![
            AgentReply::completed("I refactored the module."),
            AgentReply::completed("ok"),
        ]);
        let mut sink = RecordingSink::default();

        let outcome = run(&agent, &mut sink);
        assert!(outcome.success);
        assert!(agent.prompts()[1].contains("I refactored the module."));
    }

    #[test]
    fn error_channel_is_classified_with_output() {
        let agent = ScriptedAgent::new(vec![
            AgentReply {
                success: true,
                output: Some("done".to_string()),
                error_output: Some("ERROR: tests red".to_string()),
                ..AgentReply::default()
            },
            AgentReply::completed("OK"),
        ]);
        let mut sink = RecordingSink::default();

        let outcome = run(&agent, &mut sink);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(
            sink.records[0].outcome,
            AttemptOutcome::Classified {
                verdict: BuildVerdict::Failure {
                    detail: "tests red".to_string()
                }
            }
        );
    }

    #[test]
    fn gateway_failure_stops_without_retry() {
        let agent = ScriptedAgent::new(vec![
            AgentReply::failed("Cursor CLI timed out after 300s"),
            AgentReply::completed("OK"),
        ]);
        let mut sink = RecordingSink::default();

        let outcome = run(&agent, &mut sink);
        assert_eq!(
            outcome,
            VerifyOutcome {
                success: false,
                final_error: Some("Cursor CLI timed out after 300s".to_string()),
                attempts: 1
            }
        );
        assert_eq!(agent.invocations(), 1);
        assert!(matches!(
            sink.records[0].outcome,
            AttemptOutcome::TransportFailure { .. }
        ));
    }
}
