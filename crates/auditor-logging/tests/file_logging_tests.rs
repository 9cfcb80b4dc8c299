use std::fs;

use auditor_logging::{init_tracing_with_file, LogFormat};
use tempfile::TempDir;

// The global subscriber can be installed once per process, so this binary
// holds a single test.
#[test]
fn test_file_log_is_written_and_flushed_on_guard_drop() {
    let dir = TempDir::new().unwrap();
    let guard = init_tracing_with_file("info", LogFormat::Pretty, dir.path());

    tracing::warn!(run_id = "run-42", "Turn record skipped");
    drop(guard);

    let entries: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1);

    let log_file = &entries[0];
    let name = log_file.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("auditor.log"), "unexpected file {}", name);

    let contents = fs::read_to_string(log_file).unwrap();
    let line = contents
        .lines()
        .find(|line| line.contains("Turn record skipped"))
        .expect("warning should be flushed to the log file");
    let record: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(record["level"], "WARN");
    assert_eq!(record["fields"]["run_id"], "run-42");
}
