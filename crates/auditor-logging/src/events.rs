use auditor_schema::{AgentRole, Verdict};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Structured log events for the researcher-critic loop.
///
/// `iteration` is 1-based and counts researcher turns; `step` is the turn number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    WorkflowStarted {
        run_id: String,
        topic: String,
        max_iterations: u32,
    },
    ResearcherStarted {
        iteration: u32,
        step: u32,
        revision: bool,
    },
    ResearcherCompleted {
        iteration: u32,
        step: u32,
        title: String,
        claims: usize,
        confidence: f64,
    },
    CriticStarted {
        iteration: u32,
        step: u32,
    },
    CriticCompleted {
        iteration: u32,
        step: u32,
        verdict: Verdict,
        decision: String,
    },
    TurnFailed {
        step: u32,
        agent: AgentRole,
        error: String,
    },
    MaxIterationsReached {
        iterations: u32,
        verdict: Verdict,
    },
    WorkflowCompleted {
        run_id: String,
        iterations: u32,
        verdict: Verdict,
        duration_secs: f64,
    },
    WorkflowFailed {
        run_id: String,
        error: String,
        duration_secs: f64,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for workflow events - console output plus optional JSONL file
pub struct Logger {
    format: LogFormat,
    console: bool,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            console: true,
            file_writer: None,
        }
    }

    /// A logger that writes nothing to the console
    pub fn quiet() -> Self {
        Self {
            format: LogFormat::Json,
            console: false,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            console: true,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        if !self.console {
            return;
        }

        let mut stderr = std::io::stderr();
        let rendered = match self.format {
            LogFormat::Json => serde_json::to_string(event).ok(),
            LogFormat::Pretty => Self::render_pretty(event),
            LogFormat::Compact => {
                let timestamp = chrono::Utc::now().format("%H:%M:%S").to_string();
                Some(Self::render_compact(event, &timestamp))
            }
        };
        if let Some(text) = rendered {
            let _ = writeln!(stderr, "{}", text);
        }
    }

    fn render_pretty(event: &LogEvent) -> Option<String> {
        let text = match event {
            LogEvent::WorkflowStarted {
                topic,
                max_iterations,
                run_id,
            } => {
                let rule = "─".repeat(69);
                format!(
                    "\n{}\n  {}  {}\n  {} {}\n  {} {}\n{}\n",
                    rule.bright_blue(),
                    "research-auditor".bold().bright_white(),
                    format!("run {}", run_id).dimmed(),
                    "Topic:".dimmed(),
                    truncate(topic, 60).dimmed(),
                    "Max iterations:".dimmed(),
                    max_iterations,
                    rule.bright_blue()
                )
            }
            LogEvent::ResearcherStarted {
                iteration,
                revision,
                ..
            } => {
                let header = format!("─ Iteration {} ", iteration);
                let padding = "─".repeat(67usize.saturating_sub(header.chars().count()));
                let label = if *revision { "RESEARCHER (revision)" } else { "RESEARCHER" };
                format!(
                    "{}{}{}\n\n  {} {}",
                    "┌".bright_blue(),
                    header.bright_blue().bold(),
                    padding.bright_blue(),
                    "▶".bright_cyan(),
                    label.bright_cyan().bold()
                )
            }
            LogEvent::ResearcherCompleted {
                title,
                claims,
                confidence,
                ..
            } => format!(
                "    {} {} ({} claims, confidence {:.0}%)\n",
                "✓".bright_green(),
                truncate(title, 50),
                claims,
                confidence * 100.0
            ),
            LogEvent::CriticStarted { .. } => format!(
                "  {} {}",
                "▶".bright_magenta(),
                "CRITIC".bright_magenta().bold()
            ),
            LogEvent::CriticCompleted {
                verdict, decision, ..
            } => {
                let styled = match verdict {
                    Verdict::Pass => format!("✓ Verdict: {}", decision).bright_green(),
                    Verdict::Fail => format!("✗ Verdict: {}", decision).bright_red(),
                    Verdict::NeedsRevision => format!("→ Verdict: {}", decision).bright_yellow(),
                };
                format!(
                    "    {}\n\n{}\n",
                    styled,
                    format!("└{}┘", "─".repeat(69)).bright_blue()
                )
            }
            LogEvent::TurnFailed { step, agent, error } => format!(
                "\n{} {} turn {} failed: {}",
                "✗".bright_red(),
                agent,
                step,
                error.bright_red()
            ),
            LogEvent::MaxIterationsReached {
                iterations,
                verdict,
            } => format!(
                "{} Maximum iterations reached ({}), final verdict {}",
                "⚠".bright_yellow(),
                iterations,
                verdict
            ),
            // The final outcome is printed by the binary
            LogEvent::WorkflowCompleted { .. } | LogEvent::WorkflowFailed { .. } => return None,
        };
        Some(text)
    }

    fn render_compact(event: &LogEvent, timestamp: &str) -> String {
        match event {
            LogEvent::WorkflowStarted {
                run_id,
                max_iterations,
                ..
            } => format!("[{}] run:start {} max={}", timestamp, run_id, max_iterations),
            LogEvent::ResearcherStarted {
                iteration, step, ..
            } => format!("[{}] researcher:start:{} step={}", timestamp, iteration, step),
            LogEvent::ResearcherCompleted {
                iteration, claims, ..
            } => format!("[{}] researcher:done:{} claims={}", timestamp, iteration, claims),
            LogEvent::CriticStarted { iteration, step } => {
                format!("[{}] critic:start:{} step={}", timestamp, iteration, step)
            }
            LogEvent::CriticCompleted {
                iteration, verdict, ..
            } => format!("[{}] critic:done:{} {}", timestamp, iteration, verdict),
            LogEvent::TurnFailed { step, agent, error } => {
                format!("[{}] error:{}:{} {}", timestamp, agent, step, error)
            }
            LogEvent::MaxIterationsReached {
                iterations,
                verdict,
            } => format!("[{}] run:limit:{} {}", timestamp, iterations, verdict),
            LogEvent::WorkflowCompleted {
                iterations,
                verdict,
                duration_secs,
                ..
            } => format!(
                "[{}] run:done:{} {} {:.1}s",
                timestamp, iterations, verdict, duration_secs
            ),
            LogEvent::WorkflowFailed {
                error,
                duration_secs,
                ..
            } => format!("[{}] run:failed {} {:.1}s", timestamp, error, duration_secs),
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    let single_line = s.lines().next().unwrap_or_default();
    if s.chars().count() > max_chars || single_line.len() < s.len() {
        let cut: String = single_line.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tag() {
        let event = LogEvent::CriticCompleted {
            iteration: 2,
            step: 4,
            verdict: Verdict::NeedsRevision,
            decision: "NEEDS_REVISION (supported: 50%)".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "critic_completed");
        assert_eq!(json["verdict"], "NEEDS_REVISION");
        assert_eq!(json["step"], 4);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("compact".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_compact_rendering() {
        let line = Logger::render_compact(
            &LogEvent::TurnFailed {
                step: 3,
                agent: AgentRole::Researcher,
                error: "timed out".to_string(),
            },
            "12:00:00",
        );
        assert_eq!(line, "[12:00:00] error:researcher:3 timed out");
    }

    #[test]
    fn test_file_output_is_json_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logs").join("events.jsonl");

        let logger = Logger::with_file(LogFormat::Compact, &path).unwrap();
        logger.log(&LogEvent::CriticStarted {
            iteration: 1,
            step: 2,
        });
        logger.log(&LogEvent::MaxIterationsReached {
            iterations: 3,
            verdict: Verdict::NeedsRevision,
        });
        drop(logger);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "critic_started");
        assert!(lines[0]["timestamp"].is_string());
        assert_eq!(lines[1]["iterations"], 3);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer topic", 10), "a much ...");
        assert_eq!(truncate("line one\nline two", 40), "line one...");
    }
}
