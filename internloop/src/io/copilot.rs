//! GitHub Copilot CLI backend (`copilot --allow-all-tools -p <prompt>`).

use std::process::Command;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::types::AgentReply;
use crate::io::agent::{Agent, AgentRequest};
use crate::io::config::InternConfig;
use crate::io::process::run_with_timeout;

pub struct CopilotAgent {
    command: String,
    model: Option<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl CopilotAgent {
    pub fn from_config(config: &InternConfig) -> Self {
        Self {
            command: config.copilot.command.clone(),
            model: config.model.clone(),
            timeout: config.agent_timeout(),
            output_limit_bytes: config.output_limit_bytes,
        }
    }

    fn args(&self, prompt: &str) -> Vec<String> {
        let mut args = vec!["--allow-all-tools".to_string()];
        if let Some(model) = self.model.as_deref().filter(|m| !m.trim().is_empty()) {
            args.push("--model".to_string());
            args.push(model.to_string());
        }
        args.push("-p".to_string());
        args.push(prompt.to_string());
        args
    }

    fn run(&self, request: &AgentRequest) -> Result<AgentReply> {
        let mut cmd = Command::new(&self.command);
        cmd.args(self.args(&request.prompt))
            .current_dir(&request.workdir);
        let output = run_with_timeout(cmd, None, self.timeout, self.output_limit_bytes)?;

        let code = output.exit_code();
        let error_message = if output.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "copilot timed out");
            Some(format!(
                "Copilot CLI timed out after {}s",
                self.timeout.as_secs()
            ))
        } else if !output.status.success() {
            warn!(exit_code = code, "copilot failed");
            Some(format!("Copilot CLI exited with code {code}"))
        } else {
            None
        };

        Ok(AgentReply {
            success: error_message.is_none(),
            output: Some(output.stdout_text()),
            error_output: Some(output.stderr_text()),
            exit_code: code,
            error_message,
        })
    }
}

impl Agent for CopilotAgent {
    #[instrument(skip_all, fields(backend = "copilot", workdir = %request.workdir.display()))]
    fn invoke(&self, request: &AgentRequest) -> AgentReply {
        info!(prompt_bytes = request.prompt.len(), "starting copilot");
        match self.run(request) {
            Ok(reply) => reply,
            Err(err) => AgentReply::failed(format!("Error calling Copilot CLI: {err:#}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::prompt::PromptBuilder;
    use crate::verify::with_protocol_suffix;

    fn agent_running(command: &str) -> CopilotAgent {
        let mut config = InternConfig::default();
        config.copilot.command = command.to_string();
        CopilotAgent::from_config(&config)
    }

    #[test]
    fn prompt_is_passed_as_single_argument() {
        let agent = CopilotAgent::from_config(&InternConfig::default());
        let args = agent.args("build \"it\" now");
        assert_eq!(args, vec!["--allow-all-tools", "-p", "build \"it\" now"]);
    }

    #[test]
    fn model_flag_precedes_prompt() {
        let config = InternConfig {
            model: Some("gpt-5".to_string()),
            ..InternConfig::default()
        };
        let args = CopilotAgent::from_config(&config).args("p");
        assert_eq!(args, vec!["--allow-all-tools", "--model", "gpt-5", "-p", "p"]);
    }

    #[test]
    fn missing_binary_resolves_to_failure() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut config = InternConfig::default();
        config.copilot.command = "internloop-missing-copilot".to_string();
        let reply = CopilotAgent::from_config(&config).invoke(&AgentRequest {
            workdir: temp.path().to_path_buf(),
            prompt: "build".to_string(),
        });
        assert!(!reply.success);
        assert_eq!(reply.exit_code, -1);
        assert!(
            reply
                .error_message
                .as_deref()
                .is_some_and(|m| m.starts_with("Error calling Copilot CLI"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn huge_build_failure_still_fits_on_the_command_line() {
        let temp = tempfile::tempdir().expect("tempdir");
        let detail = format!("error: {}", "y".repeat(1_000_000));
        let fix = PromptBuilder::new().fix(&detail).expect("render");
        let reply = agent_running("true").invoke(&AgentRequest {
            workdir: temp.path().to_path_buf(),
            prompt: with_protocol_suffix(&fix),
        });
        assert!(reply.success, "{:?}", reply.error_message);
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_names_the_backend() {
        let temp = tempfile::tempdir().expect("tempdir");
        let reply = agent_running("false").invoke(&AgentRequest {
            workdir: temp.path().to_path_buf(),
            prompt: "build".to_string(),
        });
        assert!(!reply.success);
        assert_eq!(reply.exit_code, 1);
        assert_eq!(
            reply.transport_failure_message(),
            "Copilot CLI exited with code 1"
        );
    }
}
