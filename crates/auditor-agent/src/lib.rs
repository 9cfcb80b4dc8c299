//! # auditor-agent
//!
//! Command-line language-model agents that play the researcher and critic
//! roles. Each turn is one non-interactive process whose stdout carries a
//! tagged JSON block.
//!
//! ## Key Types
//!
//! - [`Agent`] - Async interface every backend implements
//! - [`AgentConfig`] - Working directory, timeout, model and extra env
//! - [`AgentOutput`] - Captured streams plus tagged-block extraction
//! - [`ProcessSpawner`] - Runs the agent binary under a timeout

mod claude;
mod opencode;
mod output;
mod spawner;
mod traits;

pub use claude::ClaudeCodeAgent;
pub use opencode::OpenCodeAgent;
pub use output::AgentOutput;
pub use spawner::ProcessSpawner;
pub use traits::{Agent, AgentConfig, AgentError, AgentType};

/// Build the default backend for `agent_type`, looked up on `PATH`
pub fn create_agent(agent_type: AgentType) -> Box<dyn Agent> {
    match agent_type {
        AgentType::ClaudeCode => Box::new(ClaudeCodeAgent::new()),
        AgentType::OpenCode => Box::new(OpenCodeAgent::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_factory_maps_each_type_to_its_binary() {
        for (agent_type, binary, name) in [
            (AgentType::ClaudeCode, "claude", "Claude Code"),
            (AgentType::OpenCode, "opencode", "OpenCode"),
        ] {
            let agent = create_agent(agent_type);
            assert_eq!(agent.agent_type(), agent_type);
            assert_eq!(agent.binary_path(), Path::new(binary));
            assert_eq!(agent.name(), name);
        }
    }

    #[test]
    fn test_parsed_type_round_trips_through_factory() {
        let agent_type: AgentType = "open-code".parse().unwrap();
        assert_eq!(create_agent(agent_type).agent_type().to_string(), "opencode");
    }
}
