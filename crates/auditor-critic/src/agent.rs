use async_trait::async_trait;
use auditor_agent::{Agent, AgentConfig};
use auditor_schema::{AuditFeedback, ResearchOutput};
use tracing::{debug, info};

use crate::{AuditError, Critic, CriticAssessment, CriticPrompts};

/// Critic backed by a command-line agent
pub struct AgentCritic {
    agent: Box<dyn Agent>,
    config: AgentConfig,
}

impl AgentCritic {
    pub fn new(agent: Box<dyn Agent>, config: AgentConfig) -> Self {
        Self { agent, config }
    }
}

#[async_trait]
impl Critic for AgentCritic {
    fn name(&self) -> &str {
        self.agent.name()
    }

    async fn audit(&self, research: &ResearchOutput) -> Result<AuditFeedback, AuditError> {
        let prompt = CriticPrompts::build_audit_prompt(research);

        debug!(
            prompt_len = prompt.len(),
            claims = research.claims.len(),
            "Running critic evaluation"
        );

        let output = self.agent.execute(&prompt, &self.config).await?;

        info!(
            exit_code = output.exit_code,
            duration_secs = output.duration.as_secs_f64(),
            "Critic completed"
        );

        CriticAssessment::parse(&output)?.into_feedback(research)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditor_agent::{AgentError, AgentOutput, AgentType};
    use auditor_schema::{Claim, Evidence, Verdict};
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    struct ScriptedAgent {
        reply: Result<String, String>,
        binary: PathBuf,
    }

    #[async_trait]
    impl Agent for ScriptedAgent {
        fn name(&self) -> &str {
            "Scripted"
        }

        fn agent_type(&self) -> AgentType {
            AgentType::OpenCode
        }

        async fn execute(
            &self,
            _prompt: &str,
            _config: &AgentConfig,
        ) -> Result<AgentOutput, AgentError> {
            match &self.reply {
                Ok(stdout) => Ok(AgentOutput::new(
                    stdout.clone(),
                    String::new(),
                    0,
                    Duration::from_millis(1),
                )),
                Err(msg) => Err(AgentError::ExecutionFailed(msg.clone())),
            }
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn binary_path(&self) -> &Path {
            &self.binary
        }
    }

    fn critic(reply: Result<&str, &str>) -> AgentCritic {
        let agent = ScriptedAgent {
            reply: reply.map(String::from).map_err(String::from),
            binary: PathBuf::from("scripted"),
        };
        AgentCritic::new(Box::new(agent), AgentConfig::new(std::env::temp_dir()))
    }

    fn research() -> ResearchOutput {
        ResearchOutput {
            title: "T".to_string(),
            summary: vec!["a".into(), "b".into(), "c".into()],
            claims: (1..=3)
                .map(|i| Claim::new(format!("C{}", i), "claim", vec![Evidence::new("q")]))
                .collect(),
            open_questions: vec![],
            confidence_score: 0.9,
        }
    }

    #[tokio::test]
    async fn test_full_support_passes() {
        let critic = critic(Ok(
            r#"<audit>{"supported_claims": 3, "issues": [], "summary": "All quoted"}</audit>"#,
        ));
        let feedback = critic.audit(&research()).await.unwrap();
        assert_eq!(feedback.verdict, Verdict::Pass);
        assert_eq!(feedback.confidence_score, 1.0);
        assert_eq!(critic.name(), "Scripted");
    }

    #[tokio::test]
    async fn test_agent_failure_propagates() {
        let critic = critic(Err("network down"));
        let err = critic.audit(&research()).await.unwrap_err();
        assert!(matches!(err, AuditError::AgentError(_)));
        assert!(err.to_string().contains("network down"));
    }
}
