use async_trait::async_trait;
use auditor_schema::{AuditFeedback, ResearchOutput, SchemaError};
use thiserror::Error;

/// Inputs for one researcher turn.
///
/// `prior_research` and `feedback` are present on revision turns only.
#[derive(Debug, Clone, Copy)]
pub struct ResearchRequest<'a> {
    pub raw_input: &'a str,
    pub prior_research: Option<&'a ResearchOutput>,
    pub feedback: Option<&'a AuditFeedback>,
}

impl<'a> ResearchRequest<'a> {
    pub fn initial(raw_input: &'a str) -> Self {
        Self {
            raw_input,
            prior_research: None,
            feedback: None,
        }
    }

    pub fn revision(
        raw_input: &'a str,
        prior_research: &'a ResearchOutput,
        feedback: &'a AuditFeedback,
    ) -> Self {
        Self {
            raw_input,
            prior_research: Some(prior_research),
            feedback: Some(feedback),
        }
    }

    pub fn is_revision(&self) -> bool {
        self.prior_research.is_some() && self.feedback.is_some()
    }
}

#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("Agent execution error: {0}")]
    AgentError(#[from] auditor_agent::AgentError),

    #[error("Researcher exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("No research block found in researcher output")]
    MissingOutput,

    #[error("Failed to parse research JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] SchemaError),

    #[error("Researcher failed: {0}")]
    Other(String),
}

/// Produces research output from raw text, optionally revising a prior draft
#[async_trait]
pub trait Researcher: Send + Sync {
    fn name(&self) -> &str;

    async fn research(&self, request: ResearchRequest<'_>) -> Result<ResearchOutput, ResearchError>;
}
