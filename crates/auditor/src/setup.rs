use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use auditor_agent::{create_agent, AgentConfig, AgentType};
use auditor_critic::AgentCritic;
use auditor_db::{Database, NullRepository, RunRepository};
use auditor_researcher::AgentResearcher;

use crate::config::ProjectConfig;

/// Agent and model chosen for one role
#[derive(Debug, Clone, PartialEq)]
pub struct RoleSetup {
    pub agent_type: AgentType,
    pub model: Option<String>,
}

impl RoleSetup {
    /// Priority: command line > config file > Claude Code with its default model
    pub fn resolve(
        cli_agent: Option<AgentType>,
        cli_model: Option<&str>,
        config_agent: Option<&str>,
        config_model: Option<&str>,
    ) -> Result<Self> {
        let agent_type = match (cli_agent, config_agent) {
            (Some(agent_type), _) => agent_type,
            (None, Some(name)) => name
                .parse::<AgentType>()
                .map_err(|e: String| anyhow::anyhow!("{} in auditor.toml", e))?,
            (None, None) => AgentType::ClaudeCode,
        };

        Ok(Self {
            agent_type,
            model: cli_model.or(config_model).map(str::to_string),
        })
    }

    pub fn agent_config(&self, working_dir: &Path, timeout: Option<Duration>) -> AgentConfig {
        let mut config = AgentConfig::new(working_dir.to_path_buf());
        if let Some(ref model) = self.model {
            config = config.with_model(model.clone());
        }
        if let Some(timeout) = timeout {
            config = config.with_timeout(timeout);
        }
        config
    }

    pub fn researcher(&self, working_dir: &Path, timeout: Option<Duration>) -> AgentResearcher {
        AgentResearcher::new(
            create_agent(self.agent_type),
            self.agent_config(working_dir, timeout),
        )
    }

    pub fn critic(&self, working_dir: &Path, timeout: Option<Duration>) -> AgentCritic {
        AgentCritic::new(
            create_agent(self.agent_type),
            self.agent_config(working_dir, timeout),
        )
    }

    /// Why this role cannot run, if its agent CLI is missing
    pub async fn unavailable(&self, role: &str) -> Option<String> {
        let agent = create_agent(self.agent_type);
        if agent.is_available().await {
            None
        } else {
            Some(format!(
                "{} agent '{}' is not available. Make sure it's installed and in PATH.",
                role,
                agent.name()
            ))
        }
    }
}

/// Pick the run database.
///
/// Priority: `--no-db` > `--db` / `AUDITOR_DATABASE` > `[database].path` > none
pub fn database_path(
    cli_db: Option<&Path>,
    no_db: bool,
    config: Option<&ProjectConfig>,
    working_dir: &Path,
) -> Option<PathBuf> {
    if no_db {
        return None;
    }
    cli_db
        .map(Path::to_path_buf)
        .or_else(|| config.and_then(|c| c.database_path(working_dir)))
}

pub fn open_database(path: Option<&Path>) -> Result<Option<Arc<Database>>> {
    path.map(|p| {
        Database::open_at(p)
            .map(Arc::new)
            .with_context(|| format!("Failed to open run database at {}", p.display()))
    })
    .transpose()
}

/// The repository the orchestrator writes to
pub fn repository(db: Option<&Arc<Database>>) -> Arc<dyn RunRepository> {
    match db {
        Some(db) => db.clone(),
        None => Arc::new(NullRepository),
    }
}
