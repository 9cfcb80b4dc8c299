use std::collections::HashSet;

use auditor_agent::AgentOutput;
use auditor_schema::{
    supported_claim_ratio, AuditFeedback, Issue, ResearchOutput, Severity, Verdict,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::AuditError;

/// The critic agent's raw judgment, before the verdict rule is applied.
///
/// Expected format in critic output:
/// ```text
/// <audit>
/// {"supported_claims": 2, "issues": [...], "summary": "...", "next_action": "..."}
/// </audit>
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticAssessment {
    /// Only an explicit FAIL is honoured; PASS/NEEDS_REVISION are re-derived
    #[serde(default)]
    pub verdict: Option<Verdict>,
    /// Number of claims the critic found supported
    #[serde(default)]
    pub supported_claims: Option<usize>,
    #[serde(default)]
    pub supported_claim_ratio: Option<f64>,
    #[serde(default)]
    pub issues: Vec<Issue>,
    pub summary: String,
    #[serde(default)]
    pub next_action: String,
}

impl CriticAssessment {
    /// Parse the audit block from a critic run
    pub fn parse(output: &AgentOutput) -> Result<Self, AuditError> {
        if !output.success() {
            return Err(AuditError::NonZeroExit {
                code: output.exit_code,
                stderr: output.stderr_tail(5),
            });
        }

        let payload = output.json_payload("audit").ok_or(AuditError::MissingOutput)?;
        debug!(json_len = payload.len(), "Found audit block");
        Ok(serde_json::from_str(payload)?)
    }

    /// Supported-claim ratio for `research`.
    ///
    /// Priority: supported claim count > explicit ratio > claims without a
    /// MUST_FIX issue.
    pub fn ratio_for(&self, research: &ResearchOutput) -> f64 {
        let total = research.claims.len();

        if let Some(supported) = self.supported_claims {
            return supported_claim_ratio(supported.min(total), total);
        }
        if let Some(ratio) = self.supported_claim_ratio {
            return ratio;
        }

        let blocked: HashSet<&str> = self
            .issues
            .iter()
            .filter(|i| i.severity == Severity::MustFix)
            .filter_map(|i| i.claim_id.as_deref())
            .filter(|id| research.claim(id).is_some())
            .collect();
        supported_claim_ratio(total - blocked.len(), total)
    }

    /// Turn the assessment into feedback with a rule-derived verdict and confidence
    pub fn into_feedback(self, research: &ResearchOutput) -> Result<AuditFeedback, AuditError> {
        for issue in &self.issues {
            if let Some(ref claim_id) = issue.claim_id {
                if research.claim(claim_id).is_none() {
                    warn!(issue = %issue.id, claim_id = %claim_id, "Issue refers to unknown claim");
                }
            }
        }

        let ratio = self.ratio_for(research);
        let fail = self.verdict == Some(Verdict::Fail);

        let mut feedback =
            AuditFeedback::assess(ratio, self.issues, self.summary, self.next_action);
        if fail {
            feedback = feedback.failed();
        }

        feedback.validate()?;
        Ok(feedback)
    }
}
