use std::sync::Arc;
use tracing::{debug, info, warn};

use auditor_critic::Critic;
use auditor_db::{NewTurn, RunFinalization, RunRepository};
use auditor_logging::{LogEvent, Logger};
use auditor_researcher::Researcher;
use auditor_schema::{AgentRole, AuditFeedback, ResearchOutput, ToRecord};

use crate::context::{Phase, WorkflowState};
use crate::error::WorkflowError;
use crate::outcome::{WorkflowRequest, WorkflowResult};

/// Drives the researcher-critic loop for one request at a time
pub struct Orchestrator<'a> {
    researcher: &'a dyn Researcher,
    critic: &'a dyn Critic,
    repo: Arc<dyn RunRepository>,
    logger: Arc<Logger>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        researcher: &'a dyn Researcher,
        critic: &'a dyn Critic,
        repo: Arc<dyn RunRepository>,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            researcher,
            critic,
            repo,
            logger,
        }
    }

    /// Run the workflow until PASS or the iteration cap.
    ///
    /// The run is finalized exactly once: `completed` with the final
    /// snapshot, or `failed` with the error that ended it.
    pub async fn run(&self, request: WorkflowRequest) -> Result<WorkflowResult, WorkflowError> {
        let max_iterations = request.max_iterations();
        if max_iterations == 0 {
            return Err(WorkflowError::InvalidRequest(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        let run_id = self
            .repo
            .create_run(&request.raw_input)
            .map_err(WorkflowError::RunCreation)?;

        info!(run_id = %run_id, max_iterations, "Starting workflow");
        self.logger.log(&LogEvent::WorkflowStarted {
            run_id: run_id.clone(),
            topic: request.raw_input.clone(),
            max_iterations,
        });

        let mut state = WorkflowState::new(run_id, request.raw_input, max_iterations);
        let outcome = self.drive(&mut state).await;
        let duration_secs = state.total_duration().as_secs_f64();

        match outcome {
            Ok(result) => {
                self.finalize(
                    &state.run_id,
                    RunFinalization::completed(result.snapshot()).with_trace_id(request.trace_id),
                );

                if !result.is_pass() {
                    self.logger.log(&LogEvent::MaxIterationsReached {
                        iterations: result.iterations,
                        verdict: result.verdict(),
                    });
                }
                self.logger.log(&LogEvent::WorkflowCompleted {
                    run_id: result.run_id.clone(),
                    iterations: result.iterations,
                    verdict: result.verdict(),
                    duration_secs,
                });
                info!(
                    run_id = %result.run_id,
                    iterations = result.iterations,
                    verdict = %result.verdict(),
                    "Workflow completed"
                );
                Ok(result)
            }
            Err(e) => {
                self.finalize(
                    &state.run_id,
                    RunFinalization::failed(e.to_string()).with_trace_id(request.trace_id),
                );
                self.logger.log(&LogEvent::WorkflowFailed {
                    run_id: state.run_id.clone(),
                    error: e.to_string(),
                    duration_secs,
                });
                warn!(run_id = %state.run_id, error = %e, "Workflow failed");
                Err(e)
            }
        }
    }

    async fn drive(&self, state: &mut WorkflowState) -> Result<WorkflowResult, WorkflowError> {
        let mut phase = Phase::Research;
        loop {
            phase = match phase {
                Phase::Research => Phase::Critique(self.research_turn(state).await?),
                Phase::Critique(research) => {
                    let feedback = self.critic_turn(state, &research).await?;
                    state.route(research, feedback)
                }
                Phase::Done { research, feedback } => {
                    return Ok(WorkflowResult {
                        run_id: state.run_id.clone(),
                        research,
                        feedback,
                        iterations: state.iterations,
                    });
                }
            };
        }
    }

    async fn research_turn(
        &self,
        state: &mut WorkflowState,
    ) -> Result<ResearchOutput, WorkflowError> {
        let step = state.next_step();
        let iteration = state.iterations + 1;
        let input = state.researcher_input();

        self.logger.log(&LogEvent::ResearcherStarted {
            iteration,
            step,
            revision: state.is_revision(),
        });
        debug!(iteration, step, "Running researcher");

        let result = self.researcher.research(state.research_request()).await;
        match result {
            Ok(research) => {
                state.record_research();
                self.append_turn(NewTurn::succeeded(
                    &state.run_id,
                    step,
                    AgentRole::Researcher,
                    input,
                    research.to_record(),
                ));
                self.logger.log(&LogEvent::ResearcherCompleted {
                    iteration,
                    step,
                    title: research.title.clone(),
                    claims: research.claims.len(),
                    confidence: research.confidence_score,
                });
                Ok(research)
            }
            Err(e) => {
                self.record_failure(state, step, AgentRole::Researcher, input, &e.to_string());
                Err(e.into())
            }
        }
    }

    async fn critic_turn(
        &self,
        state: &mut WorkflowState,
        research: &ResearchOutput,
    ) -> Result<AuditFeedback, WorkflowError> {
        let step = state.next_step();
        let iteration = state.iterations;
        let input = research.to_record();

        self.logger.log(&LogEvent::CriticStarted { iteration, step });
        debug!(iteration, step, "Running critic");

        let result = self.critic.audit(research).await;
        match result {
            Ok(feedback) => {
                self.append_turn(NewTurn::succeeded(
                    &state.run_id,
                    step,
                    AgentRole::Critic,
                    input,
                    feedback.to_record(),
                ));
                self.logger.log(&LogEvent::CriticCompleted {
                    iteration,
                    step,
                    verdict: feedback.verdict,
                    decision: feedback.short_description(),
                });
                Ok(feedback)
            }
            Err(e) => {
                self.record_failure(state, step, AgentRole::Critic, input, &e.to_string());
                Err(e.into())
            }
        }
    }

    fn record_failure(
        &self,
        state: &WorkflowState,
        step: u32,
        agent: AgentRole,
        input: serde_json::Value,
        error: &str,
    ) {
        self.append_turn(NewTurn::failed(&state.run_id, step, agent, input, error));
        self.logger.log(&LogEvent::TurnFailed {
            step,
            agent,
            error: error.to_string(),
        });
    }

    fn append_turn(&self, turn: NewTurn) {
        if let Err(e) = self.repo.append_turn(&turn) {
            warn!(
                run_id = %turn.run_id,
                step = turn.step,
                agent = %turn.agent,
                error = %e,
                "Failed to record turn"
            );
        }
    }

    fn finalize(&self, run_id: &str, finalization: RunFinalization) {
        if let Err(e) = self.repo.finalize_run(run_id, &finalization) {
            warn!(
                run_id = %run_id,
                status = %finalization.status,
                error = %e,
                "Failed to finalize run"
            );
        }
    }
}
