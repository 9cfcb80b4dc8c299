use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use serde_json::Value;

use auditor_db::{preview, Database, Run, RunFilter, RunStatus, RunSummary, Turn};
use auditor_schema::AgentRole;

#[derive(Subcommand, Debug)]
pub enum RunsAction {
    /// List recorded runs, newest first
    List {
        /// Filter by status (running, completed, failed)
        #[arg(long)]
        status: Option<RunStatus>,

        /// Search topic text
        #[arg(long)]
        search: Option<String>,

        /// Maximum number of runs to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a run with all of its turns
    Show {
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a run and its turns
    Delete { id: String },
}

pub fn handle_runs_command(action: RunsAction, db_path: Option<&Path>) -> Result<()> {
    let Some(db_path) = db_path else {
        anyhow::bail!(
            "No run database configured. Use --db, AUDITOR_DATABASE or [database] path in auditor.toml (e.g. {})",
            Database::default_path().display()
        );
    };
    let db = Database::open_at(db_path)
        .with_context(|| format!("Failed to open run database at {}", db_path.display()))?;

    match action {
        RunsAction::List {
            status,
            search,
            limit,
            json,
        } => {
            let filter = RunFilter {
                status,
                search,
                limit,
            };
            let summaries = db.runs()?.list(&filter)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else if summaries.is_empty() {
                println!("{}", "No runs found.".dimmed());
            } else {
                print_runs_table(&summaries);
            }
        }
        RunsAction::Show { id, json } => {
            let run = db
                .runs()?
                .get(&id)?
                .with_context(|| format!("Run not found: {}", id))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&run)?);
            } else {
                print_run_detail(&run);
            }
        }
        RunsAction::Delete { id } => {
            if db.runs()?.delete(&id)? {
                println!("Deleted run {}", id);
            } else {
                anyhow::bail!("Run not found: {}", id);
            }
        }
    }

    Ok(())
}

fn colored_status(status: RunStatus) -> String {
    match status {
        RunStatus::Completed => status.as_str().bright_green().to_string(),
        RunStatus::Failed => status.as_str().bright_red().to_string(),
        RunStatus::Running => status.as_str().bright_cyan().to_string(),
    }
}

fn print_runs_table(summaries: &[RunSummary]) {
    println!(
        "{:<36}  {:<20} {:<10} {:<6} {}",
        "ID".dimmed(),
        "CREATED".dimmed(),
        "STATUS".dimmed(),
        "TURNS".dimmed(),
        "TOPIC".dimmed(),
    );

    for s in summaries {
        let created = s.created_at.format("%Y-%m-%d %H:%M").to_string();
        // Pad before coloring so ANSI codes don't break alignment
        let status = format!("{:<10}", s.status.as_str());
        let status = match s.status {
            RunStatus::Completed => status.bright_green(),
            RunStatus::Failed => status.bright_red(),
            RunStatus::Running => status.bright_cyan(),
        };
        println!(
            "{:<36}  {:<20} {} {:<6} {}",
            s.id,
            created,
            status,
            s.turn_count,
            preview(&s.topic_preview, 50)
        );
    }
}

fn print_run_detail(run: &Run) {
    println!("{}", "=== Run Detail ===".bright_blue().bold());
    println!("{}  {}", "ID:".dimmed(), run.id);
    println!("{}  {}", "Status:".dimmed(), colored_status(run.status));
    println!(
        "{}  {}",
        "Started:".dimmed(),
        run.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(completed_at) = run.completed_at {
        let secs = (completed_at - run.created_at).num_milliseconds() as f64 / 1000.0;
        println!("{}  {}", "Duration:".dimmed(), format_duration(secs));
    }
    if let Some(ref trace_id) = run.trace_id {
        println!("{}  {}", "Trace:".dimmed(), trace_id);
    }
    if let Some(ref error) = run.error {
        println!("{}  {}", "Error:".dimmed(), error.bright_red());
    }
    if let Some(ref output) = run.final_output {
        if let Some(verdict) = output["feedback"]["verdict"].as_str() {
            println!("{}  {}", "Verdict:".dimmed(), verdict);
        }
        if let Some(iterations) = output["iterations"].as_u64() {
            println!("{}  {}", "Iterations:".dimmed(), iterations);
        }
    }
    println!();
    println!("{}", "Topic:".dimmed());
    println!("  {}", preview(&run.topic, 300));

    if !run.turns.is_empty() {
        println!();
        println!("{}", format!("--- Turns ({}) ---", run.turns.len()).dimmed());
        for turn in &run.turns {
            print_turn(turn);
        }
    }
}

fn print_turn(turn: &Turn) {
    let agent = match turn.agent {
        AgentRole::Researcher => turn.agent.as_str().bright_cyan(),
        AgentRole::Critic => turn.agent.as_str().bright_magenta(),
    };
    let result = if turn.ok {
        "OK".bright_green().to_string()
    } else {
        "ERR".bright_red().to_string()
    };
    println!();
    println!(
        "  {} {} {} {}",
        format!("[{}]", turn.step).bright_blue(),
        agent,
        result,
        turn.created_at.format("%H:%M:%S").to_string().dimmed()
    );

    match (&turn.output, &turn.error) {
        (Some(output), _) => println!("    {}", describe_output(turn.agent, output)),
        (None, Some(error)) => println!("    {} {}", "Error:".dimmed(), error),
        (None, None) => {}
    }
}

/// One-line description of a turn's output record
fn describe_output(agent: AgentRole, output: &Value) -> String {
    match agent {
        AgentRole::Researcher => format!(
            "{} ({} claims, confidence {:.0}%)",
            output["title"].as_str().unwrap_or("untitled"),
            output["claims"].as_array().map(Vec::len).unwrap_or(0),
            output["confidence_score"].as_f64().unwrap_or(0.0) * 100.0
        ),
        AgentRole::Critic => format!(
            "{} (supported: {:.0}%, {} issues) {}",
            output["verdict"].as_str().unwrap_or("?"),
            output["supported_claim_ratio"].as_f64().unwrap_or(0.0) * 100.0,
            output["issues"].as_array().map(Vec::len).unwrap_or(0),
            preview(output["summary"].as_str().unwrap_or_default(), 80)
        ),
    }
}

fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        format!("{:.0}s", secs)
    } else {
        let mins = (secs / 60.0).floor() as u64;
        let remaining_secs = (secs % 60.0) as u64;
        format!("{}m {}s", mins, remaining_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_researcher_output() {
        let output = json!({
            "title": "Project X-14",
            "claims": [{}, {}, {}],
            "confidence_score": 0.85
        });
        assert_eq!(
            describe_output(AgentRole::Researcher, &output),
            "Project X-14 (3 claims, confidence 85%)"
        );
    }

    #[test]
    fn test_describe_critic_output() {
        let output = json!({
            "verdict": "NEEDS_REVISION",
            "supported_claim_ratio": 0.5,
            "issues": [{}],
            "summary": "C2 lacks a quote"
        });
        assert_eq!(
            describe_output(AgentRole::Critic, &output),
            "NEEDS_REVISION (supported: 50%, 1 issues) C2 lacks a quote"
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(12.4), "12s");
        assert_eq!(format_duration(125.0), "2m 5s");
    }

    #[test]
    fn test_missing_database_is_error() {
        let err = handle_runs_command(
            RunsAction::List {
                status: None,
                search: None,
                limit: None,
                json: true,
            },
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("No run database configured"));
    }
}
