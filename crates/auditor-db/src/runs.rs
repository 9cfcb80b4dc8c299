//! Runs store for persistent run and turn history.

use auditor_schema::AgentRole;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::MutexGuard;
use uuid::Uuid;

use crate::{NewTurn, RepositoryError, RunFinalization, RunStatus};

/// A fully loaded run record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: String,
    pub topic: String,
    pub status: RunStatus,
    pub final_output: Option<Value>,
    pub error: Option<String>,
    pub trace_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub turns: Vec<Turn>,
}

/// A recorded turn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub step: u32,
    pub agent: AgentRole,
    pub input: Value,
    pub output: Option<Value>,
    pub ok: bool,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Summary for list views
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub id: String,
    pub topic_preview: String,
    pub status: RunStatus,
    pub turn_count: usize,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Filter parameters for listing runs
#[derive(Debug, Default, Clone)]
pub struct RunFilter {
    pub status: Option<RunStatus>,
    /// Substring match on the topic
    pub search: Option<String>,
    pub limit: Option<usize>,
}

/// Runs store with a borrowed connection
pub struct Runs<'db> {
    conn: MutexGuard<'db, Connection>,
}

impl<'db> Runs<'db> {
    pub(crate) fn new(conn: MutexGuard<'db, Connection>) -> Self {
        Self { conn }
    }

    /// Create a new run in `running` state, returning the generated UUID.
    pub fn create(&self, topic: &str) -> Result<String, RepositoryError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            r#"
            INSERT INTO runs (id, topic, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
            params![id, topic, RunStatus::Running.as_str(), now],
        )?;

        Ok(id)
    }

    /// Add a turn to a run.
    pub fn append_turn(&self, turn: &NewTurn) -> Result<(), RepositoryError> {
        let input = serde_json::to_string(&turn.input)?;
        let output = turn.output.as_ref().map(serde_json::to_string).transpose()?;

        self.conn.execute(
            r#"
            INSERT INTO turns (run_id, step, agent, input, output, ok, error, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                turn.run_id,
                turn.step,
                turn.agent.as_str(),
                input,
                output,
                turn.ok,
                turn.error,
                Utc::now().to_rfc3339(),
            ],
        )?;

        self.conn.execute(
            "UPDATE runs SET updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), turn.run_id],
        )?;

        Ok(())
    }

    /// Write the final status of a run.
    pub fn finalize(
        &self,
        run_id: &str,
        finalization: &RunFinalization,
    ) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let completed_at = finalization.status.is_terminal().then(|| now.clone());
        let final_output = finalization
            .final_output
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let updated = self.conn.execute(
            r#"
            UPDATE runs SET
                status = ?1,
                final_output = COALESCE(?2, final_output),
                error = COALESCE(?3, error),
                trace_id = COALESCE(?4, trace_id),
                completed_at = COALESCE(?5, completed_at),
                updated_at = ?6
            WHERE id = ?7
            "#,
            params![
                finalization.status.as_str(),
                final_output,
                finalization.error,
                finalization.trace_id,
                completed_at,
                now,
                run_id,
            ],
        )?;

        if updated == 0 {
            return Err(RepositoryError::RunNotFound(run_id.to_string()));
        }
        Ok(())
    }

    /// Get a full run by ID, including all turns.
    pub fn get(&self, id: &str) -> Result<Option<Run>, RepositoryError> {
        let run = self
            .conn
            .query_row(
                r#"
                SELECT id, topic, status, final_output, error, trace_id,
                       created_at, updated_at, completed_at
                FROM runs WHERE id = ?1
                "#,
                params![id],
                Self::row_to_run,
            )
            .optional()?;

        match run {
            Some(mut run) => {
                run.turns = self.get_turns(id)?;
                Ok(Some(run))
            }
            None => Ok(None),
        }
    }

    /// List runs matching the given filter, newest first.
    pub fn list(&self, filter: &RunFilter) -> Result<Vec<RunSummary>, RepositoryError> {
        let mut sql = String::from(
            r#"
            SELECT r.id, r.topic, r.status, r.error, r.created_at, r.completed_at,
                   (SELECT COUNT(*) FROM turns t WHERE t.run_id = r.id)
            FROM runs r WHERE 1=1
            "#,
        );
        let mut param_values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            sql.push_str(" AND r.status = ?");
            param_values.push(Box::new(status.as_str()));
        }

        if let Some(ref search) = filter.search {
            sql.push_str(" AND r.topic LIKE ? ESCAPE '\\'");
            param_values.push(Box::new(format!("%{}%", escape_like(search))));
        }

        sql.push_str(" ORDER BY r.created_at DESC, r.rowid DESC");

        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            param_values.push(Box::new(limit as i64));
        }

        let params: Vec<&dyn rusqlite::ToSql> = param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params.as_slice(), Self::row_to_summary)?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }

        Ok(summaries)
    }

    /// Delete a run by ID (cascades to turns).
    pub fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM runs WHERE id = ?1", params![id])?;
        Ok(rows_affected > 0)
    }

    // Helper methods

    fn get_turns(&self, run_id: &str) -> Result<Vec<Turn>, RepositoryError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT step, agent, input, output, ok, error, created_at
            FROM turns
            WHERE run_id = ?1
            ORDER BY step
            "#,
        )?;

        let rows = stmt.query_map(params![run_id], |row| {
            let agent: String = row.get(1)?;
            let input: String = row.get(2)?;
            let output: Option<String> = row.get(3)?;
            let created_at: String = row.get(6)?;

            Ok(Turn {
                step: row.get(0)?,
                agent: agent.parse().unwrap_or(AgentRole::Researcher),
                input: parse_json(&input),
                output: output.as_deref().map(parse_json),
                ok: row.get(4)?,
                error: row.get(5)?,
                created_at: parse_timestamp(&created_at),
            })
        })?;

        let mut turns = Vec::new();
        for row in rows {
            turns.push(row?);
        }

        Ok(turns)
    }

    fn row_to_run(row: &rusqlite::Row) -> Result<Run, rusqlite::Error> {
        let status: String = row.get(2)?;
        let final_output: Option<String> = row.get(3)?;
        let created_at: String = row.get(6)?;
        let updated_at: String = row.get(7)?;
        let completed_at: Option<String> = row.get(8)?;

        Ok(Run {
            id: row.get(0)?,
            topic: row.get(1)?,
            status: status.parse().unwrap_or(RunStatus::Running),
            final_output: final_output.as_deref().map(parse_json),
            error: row.get(4)?,
            trace_id: row.get(5)?,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
            completed_at: completed_at.as_deref().map(parse_timestamp),
            turns: Vec::new(), // Populated by get()
        })
    }

    fn row_to_summary(row: &rusqlite::Row) -> Result<RunSummary, rusqlite::Error> {
        let topic: String = row.get(1)?;
        let status: String = row.get(2)?;
        let created_at: String = row.get(4)?;
        let completed_at: Option<String> = row.get(5)?;

        Ok(RunSummary {
            id: row.get(0)?,
            topic_preview: preview(&topic, 80),
            status: status.parse().unwrap_or(RunStatus::Running),
            turn_count: row.get::<_, i64>(6)? as usize,
            error: row.get(3)?,
            created_at: parse_timestamp(&created_at),
            completed_at: completed_at.as_deref().map(parse_timestamp),
        })
    }
}

/// Escape LIKE wildcards so search text matches literally
fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn parse_json(s: &str) -> Value {
    serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// First `max_chars` characters of `s`, single-lined, with an ellipsis when cut
pub fn preview(s: &str, max_chars: usize) -> String {
    let flat: String = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > max_chars {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        flat
    }
}
