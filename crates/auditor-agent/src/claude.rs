use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::{Agent, AgentConfig, AgentError, AgentOutput, AgentType, ProcessSpawner};

/// Claude Code agent, run in print mode
pub struct ClaudeCodeAgent {
    binary_path: PathBuf,
}

impl ClaudeCodeAgent {
    pub fn new() -> Self {
        Self {
            binary_path: PathBuf::from("claude"),
        }
    }

    pub fn with_binary_path(path: PathBuf) -> Self {
        Self { binary_path: path }
    }

    fn build_args<'a>(prompt: &'a str, model: Option<&'a str>) -> Vec<&'a str> {
        // Print mode only; research and audit turns never need tools
        let mut args = vec!["--print"];

        if let Some(model) = model {
            args.push("--model");
            args.push(model);
        }

        // Prompts starting with '-' must not be read as options
        args.push("--");
        args.push(prompt);
        args
    }
}

impl Default for ClaudeCodeAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for ClaudeCodeAgent {
    fn name(&self) -> &str {
        "Claude Code"
    }

    fn agent_type(&self) -> AgentType {
        AgentType::ClaudeCode
    }

    fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.binary_path)
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn execute(&self, prompt: &str, config: &AgentConfig) -> Result<AgentOutput, AgentError> {
        debug!(
            agent = self.name(),
            prompt_len = prompt.len(),
            "Executing agent"
        );

        let args = Self::build_args(prompt, config.model.as_deref());
        ProcessSpawner::spawn(&self.binary_path, &args, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_end_options_before_prompt() {
        let args = ClaudeCodeAgent::build_args("-x weird prompt", Some("opus"));
        assert_eq!(args, vec!["--print", "--model", "opus", "--", "-x weird prompt"]);

        let args = ClaudeCodeAgent::build_args("hi", None);
        assert_eq!(args, vec!["--print", "--", "hi"]);
    }
}
