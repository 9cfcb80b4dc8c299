use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use auditor_core::{Orchestrator, WorkflowRequest};
use auditor_schema::Verdict;

use super::AppState;

const MAX_ITERATIONS_LIMIT: u32 = 20;

fn default_max_iterations() -> u32 {
    8
}

#[derive(Debug, Deserialize)]
pub struct AuditRequest {
    pub raw_input: String,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub run_id: String,
    pub verdict: Verdict,
    pub iterations: u32,
    pub title: String,
    pub summary: String,
}

pub async fn run_audit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AuditRequest>,
) -> Result<Json<AuditResponse>, (StatusCode, String)> {
    if body.raw_input.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "raw_input must not be empty".to_string()));
    }
    if !(1..=MAX_ITERATIONS_LIMIT).contains(&body.max_iterations) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("max_iterations must be between 1 and {}", MAX_ITERATIONS_LIMIT),
        ));
    }
    if let Some(ref reason) = state.unavailable {
        return Err((StatusCode::SERVICE_UNAVAILABLE, reason.clone()));
    }

    let mut request = WorkflowRequest::new(body.raw_input).with_max_iterations(body.max_iterations);
    if let Some(trace_id) = headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
    {
        request = request.with_trace_id(trace_id);
    }

    let orchestrator = Orchestrator::new(
        state.researcher.as_ref(),
        state.critic.as_ref(),
        state.repo.clone(),
        state.logger.clone(),
    );

    let result = orchestrator.run(request).await.map_err(|e| {
        let status = if e.is_invalid_request() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, e.to_string())
    })?;

    info!(run_id = %result.run_id, verdict = %result.verdict(), "Audit request completed");

    Ok(Json(AuditResponse {
        verdict: result.verdict(),
        iterations: result.iterations,
        title: result.research.title,
        summary: result.feedback.summary,
        run_id: result.run_id,
    }))
}
