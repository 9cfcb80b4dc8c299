use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::warn;

use auditor_db::Database;
use auditor_logging::Logger;

use crate::api::{self, AppState};
use crate::setup::{self, RoleSetup};

pub struct ServeOptions {
    pub host: String,
    pub port: u16,
    pub researcher: RoleSetup,
    pub critic: RoleSetup,
    pub timeout: Option<std::time::Duration>,
}

pub async fn handle_serve(
    options: ServeOptions,
    working_dir: &std::path::Path,
    db: Option<Arc<Database>>,
    logger: Logger,
) -> Result<()> {
    // Start even without agents so health checks pass; audits answer 503
    let mut unavailable = None;
    for (role, setup) in [("Researcher", &options.researcher), ("Critic", &options.critic)] {
        if let Some(reason) = setup.unavailable(role).await {
            warn!(reason = %reason, "Audits disabled");
            unavailable.get_or_insert(reason);
        }
    }

    let state = AppState {
        researcher: Arc::new(options.researcher.researcher(working_dir, options.timeout)),
        critic: Arc::new(options.critic.critic(working_dir, options.timeout)),
        repo: setup::repository(db.as_ref()),
        db,
        logger: Arc::new(logger),
        unavailable,
    };
    let router = api::create_router(state);

    let addr = format!("{}:{}", options.host, options.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server to {}", addr))?;

    eprintln!();
    eprintln!(
        "  {} {}",
        "->".bright_green(),
        format!("Listening on http://{}", addr).bold()
    );
    eprintln!("  {} Press {} to stop", "->".dimmed(), "Ctrl+C".bold());
    eprintln!();

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    eprintln!("\nShutting down...");
}
