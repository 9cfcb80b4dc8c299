mod agent;
mod prompts;
mod researcher;

pub use agent::AgentResearcher;
pub use prompts::ResearcherPrompts;
pub use researcher::{ResearchError, ResearchRequest, Researcher};
