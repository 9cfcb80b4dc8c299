//! The run repository contract and its no-op implementation.

use auditor_schema::AgentRole;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Database lock poisoned")]
    LockPoisoned,
}

/// Lifecycle status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    /// Completed and failed runs never change again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            _ => Err(format!("Unknown run status: {}", s)),
        }
    }
}

/// One turn attempt to append to a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTurn {
    pub run_id: String,
    pub step: u32,
    pub agent: AgentRole,
    pub input: Value,
    /// None when the agent call failed
    pub output: Option<Value>,
    pub ok: bool,
    pub error: Option<String>,
}

impl NewTurn {
    pub fn succeeded(
        run_id: impl Into<String>,
        step: u32,
        agent: AgentRole,
        input: Value,
        output: Value,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            step,
            agent,
            input,
            output: Some(output),
            ok: true,
            error: None,
        }
    }

    pub fn failed(
        run_id: impl Into<String>,
        step: u32,
        agent: AgentRole,
        input: Value,
        error: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            step,
            agent,
            input,
            output: None,
            ok: false,
            error: Some(error.into()),
        }
    }
}

/// Final state written when a run ends.
///
/// By convention `completed` carries `final_output` and `failed` carries
/// `error`; neither is enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFinalization {
    pub status: RunStatus,
    pub final_output: Option<Value>,
    pub error: Option<String>,
    pub trace_id: Option<String>,
}

impl RunFinalization {
    pub fn completed(final_output: Value) -> Self {
        Self {
            status: RunStatus::Completed,
            final_output: Some(final_output),
            error: None,
            trace_id: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed,
            final_output: None,
            error: Some(error.into()),
            trace_id: None,
        }
    }

    pub fn with_trace_id(mut self, trace_id: Option<String>) -> Self {
        self.trace_id = trace_id;
        self
    }
}

/// Persistence for run and turn history
pub trait RunRepository: Send + Sync {
    /// Create a run with status `running` and return its id
    fn create_run(&self, topic: &str) -> Result<String, RepositoryError>;

    fn append_turn(&self, turn: &NewTurn) -> Result<(), RepositoryError>;

    fn finalize_run(
        &self,
        run_id: &str,
        finalization: &RunFinalization,
    ) -> Result<(), RepositoryError>;
}

/// Repository used when no database is configured.
///
/// Runs still get a fresh id; turns and finalization are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRepository;

impl RunRepository for NullRepository {
    fn create_run(&self, _topic: &str) -> Result<String, RepositoryError> {
        Ok(Uuid::new_v4().to_string())
    }

    fn append_turn(&self, _turn: &NewTurn) -> Result<(), RepositoryError> {
        Ok(())
    }

    fn finalize_run(
        &self,
        _run_id: &str,
        _finalization: &RunFinalization,
    ) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_repository_issues_unique_ids() {
        let repo = NullRepository;
        let a = repo.create_run("topic").unwrap();
        let b = repo.create_run("topic").unwrap();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());

        let turn = NewTurn::succeeded(&a, 1, AgentRole::Researcher, json!({}), json!({}));
        assert!(repo.append_turn(&turn).is_ok());
        assert!(repo
            .finalize_run(&a, &RunFinalization::failed("boom"))
            .is_ok());
    }

    #[test]
    fn test_turn_constructors() {
        let ok = NewTurn::succeeded("r", 3, AgentRole::Critic, json!({"a": 1}), json!({"b": 2}));
        assert!(ok.ok);
        assert_eq!(ok.output, Some(json!({"b": 2})));
        assert_eq!(ok.error, None);

        let failed = NewTurn::failed("r", 4, AgentRole::Critic, json!({"a": 1}), "timeout");
        assert!(!failed.ok);
        assert_eq!(failed.output, None);
        assert_eq!(failed.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("completed".parse::<RunStatus>(), Ok(RunStatus::Completed));
        assert_eq!("FAILED".parse::<RunStatus>(), Ok(RunStatus::Failed));
        assert!("done".parse::<RunStatus>().is_err());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
    }

    #[test]
    fn test_finalization_trace_id() {
        let fin = RunFinalization::completed(json!({"iterations": 1}))
            .with_trace_id(Some("req-7".to_string()));
        assert_eq!(fin.status, RunStatus::Completed);
        assert_eq!(fin.trace_id.as_deref(), Some("req-7"));
        assert!(fin.error.is_none());
    }
}
