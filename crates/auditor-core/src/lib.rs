mod context;
mod error;
mod outcome;
mod workflow;

pub use context::{Phase, WorkflowState};
pub use error::WorkflowError;
pub use outcome::{WorkflowRequest, WorkflowResult, DEFAULT_MAX_ITERATIONS};
pub use workflow::Orchestrator;
