use async_trait::async_trait;
use auditor_schema::{AuditFeedback, ResearchOutput, SchemaError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Agent execution error: {0}")]
    AgentError(#[from] auditor_agent::AgentError),

    #[error("Critic exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("No audit block found in critic output")]
    MissingOutput,

    #[error("Failed to parse audit JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] SchemaError),

    #[error("Critic failed: {0}")]
    Other(String),
}

/// Audits research output against its own evidence
#[async_trait]
pub trait Critic: Send + Sync {
    fn name(&self) -> &str;

    async fn audit(&self, research: &ResearchOutput) -> Result<AuditFeedback, AuditError>;
}
