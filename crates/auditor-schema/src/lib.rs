//! # auditor-schema
//!
//! Data model shared by the researcher, the critic and the orchestrator.
//!
//! ## Key Types
//!
//! - [`ResearchOutput`] - Claims with verbatim evidence extracted from raw text
//! - [`AuditFeedback`] - The critic's verdict and itemized issues
//! - [`Verdict`] - PASS / NEEDS_REVISION / FAIL
//! - [`ToRecord`] - Conversion to a plain JSON record for logging and storage

mod audit;
mod record;
mod research;

pub use audit::{
    supported_claim_ratio, AuditFeedback, Issue, IssueCategory, IssueCounts, Severity, Verdict,
    MUST_FIX_PENALTY, PASS_THRESHOLD, SHOULD_FIX_PENALTY,
};
pub use record::ToRecord;
pub use research::{
    Claim, Evidence, ResearchOutput, MAX_SUMMARY_ITEMS, MIN_CLAIMS, MIN_SUMMARY_ITEMS,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a structured output breaks its invariants
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Invalid research output: {}", .0.join("; "))]
    InvalidResearch(Vec<String>),

    #[error("Invalid audit feedback: {}", .0.join("; "))]
    InvalidAudit(Vec<String>),
}

/// The two agents taking turns in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Researcher,
    Critic,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Researcher => "researcher",
            AgentRole::Critic => "critic",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "researcher" => Ok(AgentRole::Researcher),
            "critic" => Ok(AgentRole::Critic),
            _ => Err(format!("Unknown agent role: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_role_round_trips_through_str() {
        assert_eq!("researcher".parse::<AgentRole>(), Ok(AgentRole::Researcher));
        assert_eq!("Critic".parse::<AgentRole>(), Ok(AgentRole::Critic));
        assert!("actor".parse::<AgentRole>().is_err());
        assert_eq!(AgentRole::Critic.to_string(), "critic");
    }

    #[test]
    fn test_schema_error_lists_every_problem() {
        let err = SchemaError::InvalidResearch(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Invalid research output: a; b");
    }
}
