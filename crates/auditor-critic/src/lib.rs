mod agent;
mod assessment;
mod critic;
mod prompts;

pub use agent::AgentCritic;
pub use assessment::CriticAssessment;
pub use critic::{AuditError, Critic};
pub use prompts::CriticPrompts;
