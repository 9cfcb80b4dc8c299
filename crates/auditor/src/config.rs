//! Project configuration file support for research-auditor.
//!
//! Loads configuration from `auditor.toml` in the working directory.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Project-level configuration loaded from `auditor.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Global default agent (applies to both researcher and critic)
    pub agent: Option<String>,
    /// Global default model (applies to both researcher and critic)
    pub model: Option<String>,
    /// Researcher invocations per run
    pub max_iterations: Option<u32>,
    #[serde(default)]
    pub researcher: RoleConfig,
    #[serde(default)]
    pub critic: RoleConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Configuration for a specific role (researcher or critic)
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    pub agent: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite file for run history, relative to the working directory
    pub path: Option<PathBuf>,
}

/// The config file name
pub const CONFIG_FILE_NAME: &str = "auditor.toml";

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    /// Priority: [researcher].agent > global agent > None
    pub fn researcher_agent(&self) -> Option<&str> {
        self.researcher.agent.as_deref().or(self.agent.as_deref())
    }

    pub fn researcher_model(&self) -> Option<&str> {
        self.researcher.model.as_deref().or(self.model.as_deref())
    }

    /// Priority: [critic].agent > global agent > None
    pub fn critic_agent(&self) -> Option<&str> {
        self.critic.agent.as_deref().or(self.agent.as_deref())
    }

    pub fn critic_model(&self) -> Option<&str> {
        self.critic.model.as_deref().or(self.model.as_deref())
    }

    /// Database path resolved against `working_dir`
    pub fn database_path(&self, working_dir: &Path) -> Option<PathBuf> {
        self.database.path.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                working_dir.join(p)
            }
        })
    }
}
