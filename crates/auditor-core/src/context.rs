use auditor_researcher::ResearchRequest;
use auditor_schema::{AuditFeedback, ResearchOutput, ToRecord};
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Where the workflow goes next
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Research,
    Critique(ResearchOutput),
    Done {
        research: ResearchOutput,
        feedback: AuditFeedback,
    },
}

/// Transient state for one workflow invocation
#[derive(Debug, Clone)]
pub struct WorkflowState {
    pub run_id: String,
    pub raw_input: String,
    /// Latest research that was sent back for revision
    pub research: Option<ResearchOutput>,
    /// Feedback that sent `research` back
    pub feedback: Option<AuditFeedback>,
    /// Successful researcher turns so far
    pub iterations: u32,
    pub max_iterations: u32,
    step: u32,
    started_at: Instant,
}

#[derive(Serialize)]
struct ResearcherInput<'a> {
    raw_input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    prior_research: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    feedback: Option<Value>,
}

impl WorkflowState {
    pub fn new(run_id: String, raw_input: String, max_iterations: u32) -> Self {
        Self {
            run_id,
            raw_input,
            research: None,
            feedback: None,
            iterations: 0,
            max_iterations,
            step: 0,
            started_at: Instant::now(),
        }
    }

    /// Claim the step number for the next turn attempt
    pub fn next_step(&mut self) -> u32 {
        self.step += 1;
        self.step
    }

    /// Last step handed out, 0 before the first turn
    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn record_research(&mut self) {
        self.iterations += 1;
    }

    pub fn is_revision(&self) -> bool {
        self.research.is_some() && self.feedback.is_some()
    }

    pub fn research_request(&self) -> ResearchRequest<'_> {
        match (&self.research, &self.feedback) {
            (Some(research), Some(feedback)) => {
                ResearchRequest::revision(&self.raw_input, research, feedback)
            }
            _ => ResearchRequest::initial(&self.raw_input),
        }
    }

    /// Record stored as the input of a researcher turn
    pub fn researcher_input(&self) -> Value {
        let input = ResearcherInput {
            raw_input: &self.raw_input,
            prior_research: self.research.as_ref().map(ToRecord::to_record),
            feedback: self.feedback.as_ref().map(ToRecord::to_record),
        };
        serde_json::to_value(input).unwrap_or_default()
    }

    /// Decide the next phase once the critic has judged `research`.
    ///
    /// Stops on PASS or when the iteration cap is reached; otherwise keeps
    /// the pair for the revision turn.
    pub fn route(&mut self, research: ResearchOutput, feedback: AuditFeedback) -> Phase {
        if feedback.is_pass() || self.iterations >= self.max_iterations {
            return Phase::Done { research, feedback };
        }
        self.research = Some(research);
        self.feedback = Some(feedback);
        Phase::Research
    }

    pub fn total_duration(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditor_schema::{Claim, Evidence, Issue, IssueCategory, Severity};

    fn research() -> ResearchOutput {
        ResearchOutput {
            title: "Cooling report".to_string(),
            summary: vec!["a".into(), "b".into(), "c".into()],
            claims: vec![
                Claim::new("C1", "one", vec![Evidence::new("q1")]),
                Claim::new("C2", "two", vec![Evidence::new("q2")]),
                Claim::new("C3", "three", vec![Evidence::new("q3")]),
            ],
            open_questions: vec![],
            confidence_score: 0.8,
        }
    }

    fn revise() -> AuditFeedback {
        AuditFeedback::assess(
            0.67,
            vec![Issue::new("I1", Severity::MustFix, IssueCategory::UnsupportedClaim, "quote it")
                .for_claim("C3")],
            "C3 unsupported",
            "Add a quote for C3",
        )
    }

    #[test]
    fn test_steps_are_sequential() {
        let mut state = WorkflowState::new("r".into(), "text".into(), 3);
        assert_eq!(state.step(), 0);
        assert_eq!(state.next_step(), 1);
        assert_eq!(state.next_step(), 2);
        assert_eq!(state.step(), 2);
    }

    #[test]
    fn test_route_revises_below_cap() {
        let mut state = WorkflowState::new("r".into(), "text".into(), 2);
        state.record_research();

        assert_eq!(state.route(research(), revise()), Phase::Research);
        assert!(state.is_revision());
        assert!(state.research_request().is_revision());
    }

    #[test]
    fn test_route_stops_at_cap() {
        let mut state = WorkflowState::new("r".into(), "text".into(), 1);
        state.record_research();

        let phase = state.route(research(), revise());
        assert!(matches!(phase, Phase::Done { ref feedback, .. } if !feedback.is_pass()));
        assert!(!state.is_revision());
    }

    #[test]
    fn test_route_stops_on_pass() {
        let mut state = WorkflowState::new("r".into(), "text".into(), 5);
        state.record_research();

        let pass = AuditFeedback::assess(1.0, vec![], "All supported", "");
        assert!(matches!(state.route(research(), pass), Phase::Done { .. }));
    }

    #[test]
    fn test_researcher_input_record() {
        let mut state = WorkflowState::new("r".into(), "raw text".into(), 3);
        assert_eq!(
            state.researcher_input(),
            serde_json::json!({"raw_input": "raw text"})
        );

        state.record_research();
        state.route(research(), revise());
        let input = state.researcher_input();
        assert_eq!(input["prior_research"]["title"], "Cooling report");
        assert_eq!(input["feedback"]["verdict"], "NEEDS_REVISION");
    }
}
