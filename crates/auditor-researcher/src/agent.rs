use async_trait::async_trait;
use auditor_agent::{Agent, AgentConfig, AgentOutput};
use auditor_schema::ResearchOutput;
use tracing::{debug, info};

use crate::{ResearchError, ResearchRequest, Researcher, ResearcherPrompts};

/// Researcher backed by a command-line agent
pub struct AgentResearcher {
    agent: Box<dyn Agent>,
    config: AgentConfig,
}

impl AgentResearcher {
    pub fn new(agent: Box<dyn Agent>, config: AgentConfig) -> Self {
        Self { agent, config }
    }

    /// Parse and validate the research block from an agent's output
    pub fn parse_output(output: &AgentOutput) -> Result<ResearchOutput, ResearchError> {
        if !output.success() {
            return Err(ResearchError::NonZeroExit {
                code: output.exit_code,
                stderr: output.stderr_tail(5),
            });
        }

        let payload = output
            .json_payload("research")
            .ok_or(ResearchError::MissingOutput)?;
        let research: ResearchOutput = serde_json::from_str(payload)?;
        research.validate()?;
        Ok(research)
    }
}

#[async_trait]
impl Researcher for AgentResearcher {
    fn name(&self) -> &str {
        self.agent.name()
    }

    async fn research(
        &self,
        request: ResearchRequest<'_>,
    ) -> Result<ResearchOutput, ResearchError> {
        let prompt = ResearcherPrompts::build_prompt(&request);

        debug!(
            prompt_len = prompt.len(),
            revision = request.is_revision(),
            "Running researcher"
        );

        let output = self.agent.execute(&prompt, &self.config).await?;

        info!(
            exit_code = output.exit_code,
            duration_secs = output.duration.as_secs_f64(),
            "Researcher completed"
        );

        Self::parse_output(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditor_agent::{AgentError, AgentType};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Agent that replies with canned stdout and remembers the prompts it saw
    struct CannedAgent {
        stdout: String,
        exit_code: i32,
        prompts: Mutex<Vec<String>>,
        binary: PathBuf,
    }

    impl CannedAgent {
        fn new(stdout: &str, exit_code: i32) -> Self {
            Self {
                stdout: stdout.to_string(),
                exit_code,
                prompts: Mutex::new(Vec::new()),
                binary: PathBuf::from("canned"),
            }
        }
    }

    #[async_trait]
    impl Agent for CannedAgent {
        fn name(&self) -> &str {
            "Canned"
        }

        fn agent_type(&self) -> AgentType {
            AgentType::ClaudeCode
        }

        async fn execute(
            &self,
            prompt: &str,
            _config: &AgentConfig,
        ) -> Result<AgentOutput, AgentError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(AgentOutput::new(
                self.stdout.clone(),
                "trace line".to_string(),
                self.exit_code,
                Duration::from_millis(1),
            ))
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn binary_path(&self) -> &Path {
            &self.binary
        }
    }

    const GOOD: &str = r#"Here is the research.
<research>
{
  "title": "Project X-14",
  "summary": ["Salt cooling", "700C", "Corrosion risk"],
  "claims": [
    {"id": "C1", "text": "Uses liquid salt cooling", "evidence": [{"quote": "uses a Liquid Salt Cooling system"}]},
    {"id": "C2", "text": "Operates at 700C", "evidence": [{"quote": "It operates at 700°C"}]},
    {"id": "C3", "text": "Corrosion is the main risk", "evidence": [{"quote": "primary safety risk is pipe corrosion"}]}
  ],
  "open_questions": [],
  "confidence_score": 0.8
}
</research>"#;

    fn researcher(agent: CannedAgent) -> AgentResearcher {
        AgentResearcher::new(Box::new(agent), AgentConfig::new(std::env::temp_dir()))
    }

    #[tokio::test]
    async fn test_parses_research_block() {
        let researcher = researcher(CannedAgent::new(GOOD, 0));
        let research = researcher
            .research(ResearchRequest::initial("Project X-14 uses..."))
            .await
            .unwrap();

        assert_eq!(research.title, "Project X-14");
        assert_eq!(research.claims.len(), 3);
        assert_eq!(researcher.name(), "Canned");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_an_error() {
        let researcher = researcher(CannedAgent::new(GOOD, 2));
        let err = researcher
            .research(ResearchRequest::initial("text"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResearchError::NonZeroExit { code: 2, .. }));
        assert!(err.to_string().contains("trace line"));
    }

    #[tokio::test]
    async fn test_missing_block_is_an_error() {
        let researcher = researcher(CannedAgent::new("I could not do it.", 0));
        let err = researcher
            .research(ResearchRequest::initial("text"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResearchError::MissingOutput));
    }

    #[tokio::test]
    async fn test_invalid_research_is_rejected() {
        let too_few = r#"<research>{"title": "T", "summary": ["a","b","c"], "claims": [], "confidence_score": 0.5}</research>"#;
        let researcher = researcher(CannedAgent::new(too_few, 0));
        let err = researcher
            .research(ResearchRequest::initial("text"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResearchError::Invalid(_)));
        assert!(err.to_string().contains("at least 3 claims"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_parse_error() {
        let researcher = researcher(CannedAgent::new("<research>{not json}</research>", 0));
        let err = researcher
            .research(ResearchRequest::initial("text"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResearchError::ParseError(_)));
    }
}
