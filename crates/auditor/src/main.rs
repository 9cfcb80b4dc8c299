mod api;
mod config;
mod runs;
mod serve;
mod setup;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;

use auditor_agent::AgentType;
use auditor_core::{Orchestrator, WorkflowError, WorkflowRequest, WorkflowResult};
use auditor_logging::{init_tracing, init_tracing_with_file, LogFormat, Logger};
use auditor_schema::Verdict;

use crate::config::ProjectConfig;
use crate::runs::RunsAction;
use crate::serve::ServeOptions;
use crate::setup::RoleSetup;

#[derive(Parser, Debug)]
#[command(
    name = "auditor",
    about = "Researcher-critic audit loop for technical documents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Working directory (default: current directory)
    #[arg(short = 'd', long, global = true)]
    working_dir: Option<PathBuf>,

    /// SQLite file for run history
    #[arg(long, env = "AUDITOR_DATABASE", global = true)]
    db: Option<PathBuf>,

    /// Do not record runs, even if a database is configured
    #[arg(long, global = true)]
    no_db: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatChoice,

    /// Tracing level when RUST_LOG is not set
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Also write daily-rolling tracing logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Audit a document with the researcher-critic loop
    Run(RunArgs),

    /// Inspect recorded runs
    Runs {
        #[command(subcommand)]
        action: RunsAction,
    },

    /// Serve the audit API over HTTP
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct AgentArgs {
    /// Agent to use for both researcher and critic
    #[arg(short, long, value_enum)]
    agent: Option<AgentChoice>,

    /// Agent to use specifically for the researcher role
    #[arg(long, value_enum)]
    researcher_agent: Option<AgentChoice>,

    /// Agent to use specifically for the critic role
    #[arg(long, value_enum)]
    critic_agent: Option<AgentChoice>,

    /// Model to use (if agent supports it)
    #[arg(short, long)]
    model: Option<String>,

    /// Kill an agent process after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Text to audit (or reads from the input file if not provided)
    #[arg(short, long)]
    input: Option<String>,

    /// Path to the input file (default: ./input.md)
    #[arg(long, default_value = "input.md")]
    input_file: PathBuf,

    /// Maximum researcher iterations (default: 3)
    #[arg(short = 'n', long)]
    max_iterations: Option<u32>,

    /// Correlation id stored with the run
    #[arg(long)]
    trace_id: Option<String>,

    /// Append workflow events as JSON lines to this file
    #[arg(long)]
    event_log: Option<PathBuf>,

    /// Output final result as JSON
    #[arg(long)]
    json_output: bool,

    /// Dry run: show what would happen without executing
    #[arg(long)]
    dry_run: bool,

    #[command(flatten)]
    agents: AgentArgs,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    #[command(flatten)]
    agents: AgentArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AgentChoice {
    Claude,
    Opencode,
}

impl From<AgentChoice> for AgentType {
    fn from(choice: AgentChoice) -> Self {
        match choice {
            AgentChoice::Claude => AgentType::ClaudeCode,
            AgentChoice::Opencode => AgentType::OpenCode,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

impl AgentArgs {
    /// Resolve both roles against the project config
    fn roles(&self, config: Option<&ProjectConfig>) -> Result<(RoleSetup, RoleSetup)> {
        let researcher = RoleSetup::resolve(
            self.researcher_agent.or(self.agent).map(Into::into),
            self.model.as_deref(),
            config.and_then(|c| c.researcher_agent()),
            config.and_then(|c| c.researcher_model()),
        )?;
        let critic = RoleSetup::resolve(
            self.critic_agent.or(self.agent).map(Into::into),
            self.model.as_deref(),
            config.and_then(|c| c.critic_agent()),
            config.and_then(|c| c.critic_model()),
        )?;
        Ok((researcher, critic))
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.into();
    // Dropped when main returns, which flushes the file writer
    let _log_guard = match cli.log_dir {
        Some(ref dir) => Some(init_tracing_with_file(&cli.log_level, log_format, dir)),
        None => {
            init_tracing(&cli.log_level, log_format);
            None
        }
    };

    let working_dir = match cli.working_dir {
        Some(ref dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let config = ProjectConfig::load(&working_dir)?;
    let db_path = setup::database_path(cli.db.as_deref(), cli.no_db, config.as_ref(), &working_dir);

    match cli.command {
        Commands::Run(args) => {
            let code = handle_run(
                args,
                &working_dir,
                config.as_ref(),
                db_path.as_deref(),
                log_format,
            )
            .await?;
            Ok(ExitCode::from(code))
        }
        Commands::Runs { action } => {
            runs::handle_runs_command(action, db_path.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Serve(args) => {
            let (researcher, critic) = args.agents.roles(config.as_ref())?;
            let db = setup::open_database(db_path.as_deref())?;
            let options = ServeOptions {
                host: args.host,
                port: args.port,
                researcher,
                critic,
                timeout: args.agents.timeout(),
            };
            serve::handle_serve(options, &working_dir, db, Logger::new(log_format)).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Run one audit and return the process exit code
async fn handle_run(
    args: RunArgs,
    working_dir: &Path,
    config: Option<&ProjectConfig>,
    db_path: Option<&Path>,
    log_format: LogFormat,
) -> Result<u8> {
    let raw_input = get_input(&args, working_dir)?;
    let (researcher_setup, critic_setup) = args.agents.roles(config)?;
    let max_iterations = args
        .max_iterations
        .or(config.and_then(|c| c.max_iterations));

    if args.dry_run {
        println!("=== Dry Run ===");
        println!("Input: {}", auditor_db::preview(&raw_input, 100));
        println!("Working dir: {}", working_dir.display());
        println!("Researcher: {}", describe_role(&researcher_setup));
        println!("Critic: {}", describe_role(&critic_setup));
        match max_iterations {
            Some(max) => println!("Max iterations: {}", max),
            None => println!("Max iterations: {} (default)", auditor_core::DEFAULT_MAX_ITERATIONS),
        }
        match db_path {
            Some(path) => println!("Database: {}", path.display()),
            None => println!("Database: none (runs are not recorded)"),
        }
        return Ok(0);
    }

    for (role, setup) in [("Researcher", &researcher_setup), ("Critic", &critic_setup)] {
        if let Some(reason) = setup.unavailable(role).await {
            anyhow::bail!(reason);
        }
    }

    let db = setup::open_database(db_path)?;
    let repo = setup::repository(db.as_ref());

    let logger = match args.event_log {
        Some(ref path) => Logger::with_file(log_format, path)
            .with_context(|| format!("Failed to open event log {}", path.display()))?,
        None => Logger::new(log_format),
    };

    let timeout = args.agents.timeout();
    let researcher = researcher_setup.researcher(working_dir, timeout);
    let critic = critic_setup.critic(working_dir, timeout);
    let orchestrator = Orchestrator::new(&researcher, &critic, repo, Arc::new(logger));

    let mut request = WorkflowRequest::new(raw_input);
    if let Some(max) = max_iterations {
        request = request.with_max_iterations(max);
    }
    if let Some(trace_id) = args.trace_id {
        request = request.with_trace_id(trace_id);
    }

    match orchestrator.run(request).await {
        Ok(result) => {
            if args.json_output {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }
            Ok(result.exit_code())
        }
        Err(e) => {
            if args.json_output {
                let failure = serde_json::json!({ "status": "failed", "error": e.to_string() });
                println!("{}", serde_json::to_string_pretty(&failure)?);
            } else {
                print_failure(&e);
            }
            Ok(2)
        }
    }
}

fn get_input(args: &RunArgs, working_dir: &Path) -> Result<String> {
    // Prefer --input flag
    if let Some(ref input) = args.input {
        return Ok(input.clone());
    }

    let input_path = if args.input_file.is_absolute() {
        args.input_file.clone()
    } else {
        working_dir.join(&args.input_file)
    };

    if input_path.exists() {
        let content = std::fs::read_to_string(&input_path)
            .with_context(|| format!("Failed to read {}", input_path.display()))?;
        Ok(content.trim().to_string())
    } else {
        anyhow::bail!(
            "No input provided. Use --input or create a {} file",
            args.input_file.display()
        )
    }
}

fn describe_role(setup: &RoleSetup) -> String {
    match setup.model {
        Some(ref model) => format!("{} ({})", setup.agent_type, model),
        None => setup.agent_type.to_string(),
    }
}

fn print_result(result: &WorkflowResult) {
    let feedback = &result.feedback;
    let heading = match feedback.verdict {
        Verdict::Pass => "=== PASS ===".bright_green().bold(),
        Verdict::NeedsRevision => "=== NEEDS REVISION ===".bright_yellow().bold(),
        Verdict::Fail => "=== FAIL ===".bright_red().bold(),
    };

    eprintln!();
    eprintln!("{}", heading);
    eprintln!("Run: {}", result.run_id);
    eprintln!("Title: {}", result.research.title);
    eprintln!("Iterations: {}", result.iterations);
    eprintln!(
        "Supported claims: {:.0}%",
        feedback.supported_claim_ratio * 100.0
    );
    eprintln!("Confidence: {:.0}%", feedback.confidence_score * 100.0);
    eprintln!("Summary: {}", feedback.summary);

    eprintln!();
    eprintln!("{}", "Claims:".dimmed());
    for claim in &result.research.claims {
        eprintln!("  {} {}", claim.id.bright_blue(), claim.text);
        for evidence in &claim.evidence {
            eprintln!("      \"{}\"", evidence.quote.dimmed());
        }
    }

    if !feedback.issues.is_empty() {
        eprintln!();
        eprintln!("{}", "Issues:".dimmed());
        for issue in &feedback.issues {
            let target = issue
                .claim_id
                .as_deref()
                .map(|id| format!(" [{}]", id))
                .unwrap_or_default();
            eprintln!(
                "  {} {:?}/{:?}{}: {}",
                issue.id, issue.severity, issue.category, target, issue.fix_guidance
            );
        }
    }

    if !result.is_pass() {
        eprintln!();
        eprintln!("Reached maximum iterations ({})", result.iterations);
        if !feedback.next_action.is_empty() {
            eprintln!("Next action: {}", feedback.next_action);
        }
    }
}

fn print_failure(error: &WorkflowError) {
    eprintln!();
    eprintln!("{}", "=== FAILED ===".bright_red().bold());
    eprintln!("Error: {}", error);
}
