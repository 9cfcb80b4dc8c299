mod audit;
mod runs;

use std::sync::Arc;

use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use auditor_critic::Critic;
use auditor_db::{Database, RunRepository};
use auditor_logging::Logger;
use auditor_researcher::Researcher;

#[derive(Clone)]
pub struct AppState {
    pub researcher: Arc<dyn Researcher>,
    pub critic: Arc<dyn Critic>,
    pub repo: Arc<dyn RunRepository>,
    /// Read side for `/api/runs`; None when no database is configured
    pub db: Option<Arc<Database>>,
    pub logger: Arc<Logger>,
    /// Set when an agent CLI is missing; audits answer 503 with this message
    pub unavailable: Option<String>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/health", get(health))
        .route("/audit", post(audit::run_audit))
        .route("/api/runs", get(runs::list_runs))
        .route("/api/runs/{id}", get(runs::get_run))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn status() -> Json<Value> {
    Json(json!({
        "status": "research-auditor server is running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::audit::{run_audit, AuditRequest};
    use super::runs::{get_run, list_runs, ListParams};
    use super::*;
    use async_trait::async_trait;
    use auditor_critic::AuditError;
    use auditor_db::{NullRepository, RunStatus};
    use auditor_researcher::{ResearchError, ResearchRequest};
    use auditor_schema::{AuditFeedback, Claim, Evidence, ResearchOutput, Verdict};
    use axum::extract::{Path, Query, State};
    use axum::http::{HeaderMap, HeaderValue, StatusCode};

    struct FixedResearcher;

    #[async_trait]
    impl Researcher for FixedResearcher {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn research(
            &self,
            _request: ResearchRequest<'_>,
        ) -> Result<ResearchOutput, ResearchError> {
            Ok(ResearchOutput {
                title: "Project X-14".to_string(),
                summary: vec!["a".into(), "b".into(), "c".into()],
                claims: (1..=3)
                    .map(|i| Claim::new(format!("C{}", i), "claim", vec![Evidence::new("quote")]))
                    .collect(),
                open_questions: vec![],
                confidence_score: 0.9,
            })
        }
    }

    /// Passes everything, or fails every call when `broken`
    struct FixedCritic {
        broken: bool,
    }

    #[async_trait]
    impl Critic for FixedCritic {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn audit(&self, _research: &ResearchOutput) -> Result<AuditFeedback, AuditError> {
            if self.broken {
                return Err(AuditError::Other("model unavailable".to_string()));
            }
            Ok(AuditFeedback::assess(1.0, vec![], "All claims supported", ""))
        }
    }

    fn state(db: Option<Arc<Database>>, broken_critic: bool) -> AppState {
        let repo: Arc<dyn RunRepository> = match db {
            Some(ref db) => db.clone(),
            None => Arc::new(NullRepository),
        };
        AppState {
            researcher: Arc::new(FixedResearcher),
            critic: Arc::new(FixedCritic {
                broken: broken_critic,
            }),
            repo,
            db,
            logger: Arc::new(Logger::quiet()),
            unavailable: None,
        }
    }

    fn request(raw_input: &str, max_iterations: u32) -> AuditRequest {
        AuditRequest {
            raw_input: raw_input.to_string(),
            max_iterations,
        }
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(health().await.0, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_audit_returns_verdict() {
        let response = run_audit(
            State(state(None, false)),
            HeaderMap::new(),
            axum::Json(request("Project X-14 uses salt cooling", 8)),
        )
        .await
        .unwrap();

        assert_eq!(response.0.verdict, Verdict::Pass);
        assert_eq!(response.0.iterations, 1);
        assert_eq!(response.0.title, "Project X-14");
        assert_eq!(response.0.summary, "All claims supported");
    }

    #[tokio::test]
    async fn test_audit_rejects_bad_input() {
        for body in [request("   ", 8), request("text", 0), request("text", 21)] {
            let (status, _) =
                run_audit(State(state(None, false)), HeaderMap::new(), axum::Json(body))
                    .await
                    .unwrap_err();
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_audit_unavailable_agent() {
        let mut state = state(None, false);
        state.unavailable = Some("Researcher agent 'Claude Code' is not available".to_string());

        let (status, message) =
            run_audit(State(state), HeaderMap::new(), axum::Json(request("text", 3)))
                .await
                .unwrap_err();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(message.contains("not available"));
    }

    #[tokio::test]
    async fn test_audit_failure_is_500_and_recorded() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("req-123"));

        let (status, message) = run_audit(
            State(state(Some(db.clone()), true)),
            headers,
            axum::Json(request("text", 3)),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(message.contains("model unavailable"));

        let summaries = list_runs(
            State(state(Some(db.clone()), false)),
            Query(ListParams::default()),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].status, RunStatus::Failed);

        let run = get_run(State(state(Some(db), false)), Path(summaries[0].id.clone()))
            .await
            .unwrap()
            .0;
        assert_eq!(run.trace_id.as_deref(), Some("req-123"));
        assert_eq!(run.turns.len(), 2);
    }

    #[tokio::test]
    async fn test_runs_without_database() {
        let (status, _) = list_runs(State(state(None, false)), Query(ListParams::default()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = get_run(State(state(None, false)), Path("x".to_string()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unknown_run_is_404() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let (status, _) = get_run(State(state(Some(db), false)), Path("missing".to_string()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_status() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let params = ListParams {
            status: Some("done".to_string()),
            ..Default::default()
        };
        let (status, _) = list_runs(State(state(Some(db), false)), Query(params))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
