use auditor_schema::{AuditFeedback, ResearchOutput, ToRecord, Verdict};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Researcher invocations allowed when the request does not say otherwise
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;

/// One workflow invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub raw_input: String,
    #[serde(default)]
    pub max_iterations: Option<u32>,
    /// Correlation id stored on the run
    #[serde(default)]
    pub trace_id: Option<String>,
}

impl WorkflowRequest {
    pub fn new(raw_input: impl Into<String>) -> Self {
        Self {
            raw_input: raw_input.into(),
            max_iterations: None,
            trace_id: None,
        }
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = Some(max);
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS)
    }
}

/// Final research and the critic's last word on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub run_id: String,
    pub research: ResearchOutput,
    pub feedback: AuditFeedback,
    /// Researcher turns that produced output
    pub iterations: u32,
}

impl ToRecord for WorkflowResult {}

#[derive(Serialize)]
struct RunSnapshot<'a> {
    research: &'a ResearchOutput,
    feedback: &'a AuditFeedback,
    iterations: u32,
}

impl ToRecord for RunSnapshot<'_> {}

impl WorkflowResult {
    pub fn verdict(&self) -> Verdict {
        self.feedback.verdict
    }

    pub fn is_pass(&self) -> bool {
        self.feedback.is_pass()
    }

    /// The `final_output` stored when the run completes
    pub fn snapshot(&self) -> Value {
        RunSnapshot {
            research: &self.research,
            feedback: &self.feedback,
            iterations: self.iterations,
        }
        .to_record()
    }

    /// Process exit code: 0 on PASS, 1 when the cap ended the run first
    pub fn exit_code(&self) -> u8 {
        if self.is_pass() {
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditor_schema::{Claim, Evidence};

    fn result(feedback: AuditFeedback) -> WorkflowResult {
        WorkflowResult {
            run_id: "run-1".to_string(),
            research: ResearchOutput {
                title: "T".to_string(),
                summary: vec!["a".into(), "b".into(), "c".into()],
                claims: (1..=3)
                    .map(|i| Claim::new(format!("C{}", i), "c", vec![Evidence::new("q")]))
                    .collect(),
                open_questions: vec![],
                confidence_score: 0.9,
            },
            feedback,
            iterations: 2,
        }
    }

    #[test]
    fn test_default_max_iterations() {
        let request = WorkflowRequest::new("text");
        assert_eq!(request.max_iterations(), DEFAULT_MAX_ITERATIONS);
        assert_eq!(request.with_max_iterations(7).max_iterations(), 7);
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: WorkflowRequest = serde_json::from_str(r#"{"raw_input": "x"}"#).unwrap();
        assert_eq!(request.max_iterations, None);
        assert_eq!(request.trace_id, None);
    }

    #[test]
    fn test_snapshot_omits_run_id() {
        let result = result(AuditFeedback::assess(1.0, vec![], "ok", ""));
        let snapshot = result.snapshot();
        assert_eq!(snapshot["iterations"], 2);
        assert_eq!(snapshot["feedback"]["verdict"], "PASS");
        assert!(snapshot.get("run_id").is_none());
        assert_eq!(result.to_record()["run_id"], "run-1");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(result(AuditFeedback::assess(1.0, vec![], "ok", "")).exit_code(), 0);
        assert_eq!(result(AuditFeedback::assess(0.5, vec![], "weak", "")).exit_code(), 1);
    }
}
