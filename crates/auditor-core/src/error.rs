use auditor_critic::AuditError;
use auditor_db::RepositoryError;
use auditor_researcher::ResearchError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Research turn failed: {0}")]
    Research(#[from] ResearchError),

    #[error("Audit turn failed: {0}")]
    Audit(#[from] AuditError),

    #[error("Could not create run: {0}")]
    RunCreation(#[source] RepositoryError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl WorkflowError {
    /// Errors caused by the caller rather than a collaborator or storage
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, WorkflowError::InvalidRequest(_))
    }
}
