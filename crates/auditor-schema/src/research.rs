use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{SchemaError, ToRecord};

pub const MIN_SUMMARY_ITEMS: usize = 3;
pub const MAX_SUMMARY_ITEMS: usize = 6;
pub const MIN_CLAIMS: usize = 3;

/// The structured output of one researcher turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchOutput {
    /// Title of the analyzed document
    pub title: String,
    /// Executive summary bullets (3-6)
    pub summary: Vec<String>,
    /// Claims table, at least three entries
    pub claims: Vec<Claim>,
    /// Statements that could not yet be supported by a quote
    #[serde(default)]
    pub open_questions: Vec<String>,
    /// Researcher's own confidence (0.0 - 1.0)
    pub confidence_score: f64,
}

/// A short, testable statement backed by quotes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Stable identifier such as "C1"
    pub id: String,
    pub text: String,
    pub evidence: Vec<Evidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A verbatim excerpt from the source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub quote: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Evidence {
    pub fn new(quote: impl Into<String>) -> Self {
        Self {
            quote: quote.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl Claim {
    pub fn new(id: impl Into<String>, text: impl Into<String>, evidence: Vec<Evidence>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            evidence,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl ResearchOutput {
    /// Check every structural invariant, collecting all violations.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push("title is empty".to_string());
        }

        let summary_len = self.summary.len();
        if !(MIN_SUMMARY_ITEMS..=MAX_SUMMARY_ITEMS).contains(&summary_len) {
            errors.push(format!(
                "summary must have {}-{} items, found {}",
                MIN_SUMMARY_ITEMS, MAX_SUMMARY_ITEMS, summary_len
            ));
        }

        if self.claims.len() < MIN_CLAIMS {
            errors.push(format!(
                "at least {} claims required, found {}",
                MIN_CLAIMS,
                self.claims.len()
            ));
        }

        let mut seen = HashSet::new();
        for (index, claim) in self.claims.iter().enumerate() {
            let label = if claim.id.trim().is_empty() {
                errors.push(format!("claim #{} has an empty id", index + 1));
                format!("#{}", index + 1)
            } else {
                claim.id.clone()
            };

            if !claim.id.trim().is_empty() && !seen.insert(claim.id.as_str()) {
                errors.push(format!("duplicate claim id {}", claim.id));
            }
            if claim.evidence.is_empty() {
                errors.push(format!("claim {} has no evidence", label));
            }
            if claim.evidence.iter().any(|e| e.quote.trim().is_empty()) {
                errors.push(format!("claim {} has an empty quote", label));
            }
        }

        if !(0.0..=1.0).contains(&self.confidence_score) {
            errors.push(format!(
                "confidence_score {} outside [0, 1]",
                self.confidence_score
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::InvalidResearch(errors))
        }
    }

    /// Look up a claim by its identifier
    pub fn claim(&self, id: &str) -> Option<&Claim> {
        self.claims.iter().find(|c| c.id == id)
    }

    /// Total number of evidence quotes across all claims
    pub fn evidence_count(&self) -> usize {
        self.claims.iter().map(|c| c.evidence.len()).sum()
    }
}

impl ToRecord for ResearchOutput {}
