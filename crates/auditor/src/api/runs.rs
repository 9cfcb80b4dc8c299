use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use auditor_db::{Database, Run, RunFilter, RunStatus, RunSummary};

use super::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub search: Option<String>,
    pub limit: Option<usize>,
}

fn database(state: &AppState) -> Result<&Arc<Database>, (StatusCode, String)> {
    state.db.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "No run database configured".to_string(),
    ))
}

pub async fn list_runs(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<RunSummary>>, (StatusCode, String)> {
    let db = database(&state)?;
    let status = params
        .status
        .map(|s| s.parse::<RunStatus>())
        .transpose()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let filter = RunFilter {
        status,
        search: params.search,
        limit: params.limit,
    };

    let summaries = db
        .runs()
        .and_then(|runs| runs.list(&filter))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(summaries))
}

pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Run>, (StatusCode, String)> {
    let db = database(&state)?;
    let run = db
        .runs()
        .and_then(|runs| runs.get(&id))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Run not found: {}", id)))?;

    Ok(Json(run))
}
