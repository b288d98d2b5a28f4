//! Cursor CLI backend (`agent -p --output-format json`).

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::core::types::AgentReply;
use crate::io::agent::{Agent, AgentRequest};
use crate::io::config::InternConfig;
use crate::io::process::run_with_timeout;

/// Final message emitted by `agent --output-format json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct CursorResponse {
    #[serde(rename = "type")]
    kind: String,
    subtype: String,
    is_error: bool,
    duration_ms: u64,
    result: String,
    session_id: String,
}

pub struct CursorAgent {
    command: String,
    model: Option<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl CursorAgent {
    pub fn from_config(config: &InternConfig) -> Self {
        Self {
            command: config.cursor.command.clone(),
            model: config.model.clone(),
            timeout: config.agent_timeout(),
            output_limit_bytes: config.output_limit_bytes,
        }
    }

    fn command(&self, workdir: &Path) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(self.args()).current_dir(workdir);
        cmd
    }

    /// Print mode with JSON output; `-f` lets the agent write files unprompted.
    fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            "--output-format".to_string(),
            "json".to_string(),
        ];
        if let Some(model) = self.model.as_deref().filter(|m| !m.trim().is_empty()) {
            args.push("-m".to_string());
            args.push(model.to_string());
        }
        args.push("-f".to_string());
        args
    }

    fn run(&self, request: &AgentRequest) -> Result<AgentReply> {
        let output = run_with_timeout(
            self.command(&request.workdir),
            Some(request.prompt.as_bytes()),
            self.timeout,
            self.output_limit_bytes,
        )?;

        let stdout = output.stdout_text();
        let stderr = output.stderr_text();
        if output.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "cursor agent timed out");
            return Ok(AgentReply {
                success: false,
                output: non_empty(stdout),
                error_output: non_empty(stderr),
                exit_code: -1,
                error_message: Some(format!(
                    "Cursor CLI timed out after {}s",
                    self.timeout.as_secs()
                )),
            });
        }
        if !output.status.success() {
            let code = output.exit_code();
            warn!(exit_code = code, "cursor agent failed");
            return Ok(AgentReply {
                success: false,
                output: non_empty(stdout),
                error_output: non_empty(stderr),
                exit_code: code,
                error_message: Some(format!("Cursor CLI exited with code {code}")),
            });
        }
        Ok(parse_cursor_response(&stdout, &stderr))
    }
}

impl Agent for CursorAgent {
    #[instrument(skip_all, fields(backend = "cursor", workdir = %request.workdir.display()))]
    fn invoke(&self, request: &AgentRequest) -> AgentReply {
        info!(prompt_bytes = request.prompt.len(), "starting cursor agent");
        match self.run(request) {
            Ok(reply) => reply,
            Err(err) => AgentReply::failed(format!("Error calling Cursor CLI: {err:#}")),
        }
    }
}

/// Interpret the JSON document the CLI prints on a zero exit.
fn parse_cursor_response(stdout: &str, stderr: &str) -> AgentReply {
    if stdout.trim().is_empty() {
        return AgentReply {
            success: false,
            error_output: non_empty(stderr.to_string()),
            error_message: Some("Cursor CLI returned empty output".to_string()),
            ..AgentReply::default()
        };
    }

    let response: CursorResponse = match serde_json::from_str(stdout) {
        Ok(response) => response,
        Err(err) => {
            return AgentReply {
                success: false,
                output: Some(stdout.to_string()),
                error_output: non_empty(stderr.to_string()),
                error_message: Some(format!(
                    "Failed to parse Cursor CLI JSON response: {err}"
                )),
                ..AgentReply::default()
            };
        }
    };
    debug!(
        kind = %response.kind,
        subtype = %response.subtype,
        duration_ms = response.duration_ms,
        session_id = %response.session_id,
        "cursor response parsed"
    );

    if response.is_error || response.subtype != "success" {
        return AgentReply {
            success: false,
            output: Some(response.result),
            error_output: non_empty(stderr.to_string()),
            exit_code: 1,
            error_message: Some(format!("Cursor CLI returned error: {}", response.subtype)),
        };
    }

    AgentReply::completed(response.result)
}

fn non_empty(text: String) -> Option<String> {
    (!text.trim().is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_include_model_only_when_set() {
        let mut agent = CursorAgent::from_config(&InternConfig::default());
        assert_eq!(agent.args(), vec!["-p", "--output-format", "json", "-f"]);

        agent.model = Some("sonnet-4".to_string());
        assert_eq!(
            agent.args(),
            vec!["-p", "--output-format", "json", "-m", "sonnet-4", "-f"]
        );
    }

    #[test]
    fn success_response_yields_result_text() {
        let reply = parse_cursor_response(
            r#"{"type":"result","subtype":"success","is_error":false,"result":"OK","session_id":"s1"}"#,
            "",
        );
        assert_eq!(reply, AgentReply::completed("OK"));
    }

    #[test]
    fn error_response_is_a_gateway_failure() {
        let reply = parse_cursor_response(
            r#"{"type":"result","subtype":"error_max_turns","is_error":true,"result":"partial"}"#,
            "warn",
        );
        assert!(!reply.success);
        assert_eq!(reply.output.as_deref(), Some("partial"));
        assert_eq!(reply.error_output.as_deref(), Some("warn"));
        assert_eq!(
            reply.error_message.as_deref(),
            Some("Cursor CLI returned error: error_max_turns")
        );
    }

    #[test]
    fn empty_and_garbled_output_are_gateway_failures() {
        let reply = parse_cursor_response("  ", "boom");
        assert!(!reply.success);
        assert_eq!(
            reply.error_message.as_deref(),
            Some("Cursor CLI returned empty output")
        );

        let reply = parse_cursor_response("not json", "");
        assert!(!reply.success);
        assert_eq!(reply.output.as_deref(), Some("not json"));
        assert!(
            reply
                .error_message
                .as_deref()
                .is_some_and(|m| m.starts_with("Failed to parse Cursor CLI JSON response"))
        );
    }

    #[test]
    fn missing_binary_resolves_to_failure() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut config = InternConfig::default();
        config.cursor.command = "internloop-missing-cursor".to_string();
        let reply = CursorAgent::from_config(&config).invoke(&AgentRequest {
            workdir: temp.path().to_path_buf(),
            prompt: "hi".to_string(),
        });
        assert!(!reply.success);
        assert!(
            reply
                .error_message
                .as_deref()
                .is_some_and(|m| m.starts_with("Error calling Cursor CLI"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_names_the_backend() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut config = InternConfig::default();
        config.cursor.command = "false".to_string();
        let reply = CursorAgent::from_config(&config).invoke(&AgentRequest {
            workdir: temp.path().to_path_buf(),
            prompt: "hi".to_string(),
        });
        assert!(!reply.success);
        assert_eq!(reply.exit_code, 1);
        assert_eq!(
            reply.transport_failure_message(),
            "Cursor CLI exited with code 1"
        );
    }
}
