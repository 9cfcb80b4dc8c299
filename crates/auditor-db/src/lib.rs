//! Database layer for research-auditor.
//!
//! Provides the [`RunRepository`] contract used by the orchestrator, a
//! SQLite-backed [`Database`] implementing it, and the [`NullRepository`]
//! used when persistence is not configured.

mod repository;
mod runs;

pub use repository::{
    NewTurn, NullRepository, RepositoryError, RunFinalization, RunRepository, RunStatus,
};
pub use runs::{preview, Run, RunFilter, RunSummary, Runs, Turn};

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// The main database struct that owns the SQLite connection.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at a specific path, creating parent directories.
    pub fn open_at(path: &Path) -> Result<Self, RepositoryError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).ok();
            }
        }

        debug!(path = %path.display(), "Opening run database");
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, RepositoryError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Suggested location for a local database:
    /// `~/.local/share/research-auditor/runs.db`.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("research-auditor")
            .join("runs.db")
    }

    /// Access the runs store.
    pub fn runs(&self) -> Result<Runs<'_>, RepositoryError> {
        let conn = self.conn.lock().map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(Runs::new(conn))
    }

    fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                topic TEXT NOT NULL,
                status TEXT NOT NULL,
                final_output TEXT,
                error TEXT,
                trace_id TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                completed_at TEXT
            );

            CREATE TABLE IF NOT EXISTS turns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
                step INTEGER NOT NULL,
                agent TEXT NOT NULL,
                input TEXT NOT NULL,
                output TEXT,
                ok INTEGER NOT NULL,
                error TEXT,
                created_at TEXT NOT NULL,
                UNIQUE (run_id, step)
            );

            CREATE INDEX IF NOT EXISTS idx_runs_created_at ON runs(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_turns_run_id ON turns(run_id);
            "#,
        )
    }
}

impl RunRepository for Database {
    fn create_run(&self, topic: &str) -> Result<String, RepositoryError> {
        self.runs()?.create(topic)
    }

    fn append_turn(&self, turn: &NewTurn) -> Result<(), RepositoryError> {
        self.runs()?.append_turn(turn)
    }

    fn finalize_run(
        &self,
        run_id: &str,
        finalization: &RunFinalization,
    ) -> Result<(), RepositoryError> {
        self.runs()?.finalize(run_id, finalization)
    }
}
