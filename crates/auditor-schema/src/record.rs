use serde::Serialize;
use serde_json::Value;

/// Explicit conversion of a structured output into a plain JSON record.
///
/// Turn inputs/outputs and run snapshots are stored as records, so anything
/// the orchestrator persists goes through this trait.
pub trait ToRecord: Serialize {
    fn to_record(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
