use serde::{Deserialize, Serialize};

use crate::{SchemaError, ToRecord};

/// Minimum supported-claim ratio for a PASS
pub const PASS_THRESHOLD: f64 = 0.90;
/// Confidence deducted per MUST_FIX issue
pub const MUST_FIX_PENALTY: f64 = 0.15;
/// Confidence deducted per SHOULD_FIX issue
pub const SHOULD_FIX_PENALTY: f64 = 0.05;

/// The critic's judgment on a research output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Claims are sound and supported
    Pass,
    /// Fixable issues remain
    NeedsRevision,
    /// The source material cannot support the research
    Fail,
}

impl Verdict {
    /// Deterministic verdict for a supported-claim ratio and issue tally.
    ///
    /// Never yields `Fail`; that verdict is reserved for the critic's own
    /// judgment about unusable source material.
    pub fn decide(supported_claim_ratio: f64, counts: IssueCounts) -> Self {
        if counts.must_fix > 0 {
            Verdict::NeedsRevision
        } else if supported_claim_ratio >= PASS_THRESHOLD {
            Verdict::Pass
        } else {
            Verdict::NeedsRevision
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::NeedsRevision => "NEEDS_REVISION",
            Verdict::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    MustFix,
    ShouldFix,
    Nit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCategory {
    UnsupportedClaim,
    WeakSupport,
    OverInference,
    MissingContext,
    Contradiction,
    UnclearWording,
}

/// A single problem found by the critic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub severity: Severity,
    pub category: IssueCategory,
    /// Claim the issue refers to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    pub fix_guidance: String,
}

impl Issue {
    pub fn new(
        id: impl Into<String>,
        severity: Severity,
        category: IssueCategory,
        fix_guidance: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            category,
            claim_id: None,
            evidence: None,
            fix_guidance: fix_guidance.into(),
        }
    }

    pub fn for_claim(mut self, claim_id: impl Into<String>) -> Self {
        self.claim_id = Some(claim_id.into());
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }
}

/// Issue counts per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssueCounts {
    pub must_fix: usize,
    pub should_fix: usize,
    pub nit: usize,
}

impl IssueCounts {
    pub fn tally(issues: &[Issue]) -> Self {
        issues.iter().fold(Self::default(), |mut counts, issue| {
            match issue.severity {
                Severity::MustFix => counts.must_fix += 1,
                Severity::ShouldFix => counts.should_fix += 1,
                Severity::Nit => counts.nit += 1,
            }
            counts
        })
    }

    /// `ratio - 0.15 * must_fix - 0.05 * should_fix`, clamped to [0, 1]
    pub fn confidence(&self, supported_claim_ratio: f64) -> f64 {
        let score = supported_claim_ratio
            - MUST_FIX_PENALTY * self.must_fix as f64
            - SHOULD_FIX_PENALTY * self.should_fix as f64;
        score.clamp(0.0, 1.0)
    }
}

/// Fraction of claims the critic considers supported; zero when there are no claims
pub fn supported_claim_ratio(supported: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (supported as f64 / total as f64).clamp(0.0, 1.0)
    }
}

/// The structured critique produced by the critic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditFeedback {
    pub verdict: Verdict,
    pub supported_claim_ratio: f64,
    pub confidence_score: f64,
    #[serde(default)]
    pub issues: Vec<Issue>,
    /// Short explanation of the verdict
    pub summary: String,
    /// Guidance for the next researcher turn
    #[serde(default)]
    pub next_action: String,
}

impl AuditFeedback {
    /// Build feedback whose verdict and confidence follow the deterministic rule.
    pub fn assess(
        supported_claim_ratio: f64,
        issues: Vec<Issue>,
        summary: impl Into<String>,
        next_action: impl Into<String>,
    ) -> Self {
        let ratio = if supported_claim_ratio.is_nan() {
            0.0
        } else {
            supported_claim_ratio.clamp(0.0, 1.0)
        };
        let counts = IssueCounts::tally(&issues);

        Self {
            verdict: Verdict::decide(ratio, counts),
            supported_claim_ratio: ratio,
            confidence_score: counts.confidence(ratio),
            issues,
            summary: summary.into(),
            next_action: next_action.into(),
        }
    }

    /// Override the derived verdict with FAIL
    pub fn failed(mut self) -> Self {
        self.verdict = Verdict::Fail;
        self
    }

    pub fn counts(&self) -> IssueCounts {
        IssueCounts::tally(&self.issues)
    }

    pub fn is_pass(&self) -> bool {
        self.verdict.is_pass()
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut errors = Vec::new();

        if !(0.0..=1.0).contains(&self.supported_claim_ratio) {
            errors.push(format!(
                "supported_claim_ratio {} outside [0, 1]",
                self.supported_claim_ratio
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_score) {
            errors.push(format!(
                "confidence_score {} outside [0, 1]",
                self.confidence_score
            ));
        }
        for issue in &self.issues {
            if issue.fix_guidance.trim().is_empty() {
                errors.push(format!("issue {} has no fix guidance", issue.id));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::InvalidAudit(errors))
        }
    }

    /// Get a short description of the feedback for logging
    pub fn short_description(&self) -> String {
        let counts = self.counts();
        if self.issues.is_empty() {
            format!(
                "{} (supported: {:.0}%)",
                self.verdict,
                self.supported_claim_ratio * 100.0
            )
        } else {
            format!(
                "{} (supported: {:.0}%, {} must-fix, {} should-fix, {} nit)",
                self.verdict,
                self.supported_claim_ratio * 100.0,
                counts.must_fix,
                counts.should_fix,
                counts.nit
            )
        }
    }
}

impl ToRecord for AuditFeedback {}
