//! CLI for the issue-template compliance bot
//!
//! Run `triage --help` for usage information.

// CLI binaries legitimately need println! for user output
#![allow(clippy::disallowed_macros)]

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use triage::{
    DryRunTracker, GitHubTracker, IssueCategory, IssueTracker, Orchestrator, RunReport, Trigger,
    TriageConfig, Validator,
};

#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Enforce issue templates: label, nudge and close non-compliant issues")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Repository in owner/repo format (defaults to GITHUB_REPOSITORY)
    #[arg(short, long, global = true)]
    repo: Option<String>,

    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Output format: json, text
    #[arg(short, long, default_value = "text", global = true)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle the current GitHub Actions event (issue or schedule)
    Run {
        /// Log mutations instead of performing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Close issues that have needed info for too long
    Sweep {
        /// Log mutations instead of performing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate an issue body offline
    Check {
        /// Template to validate against
        #[arg(long, value_enum)]
        category: IssueCategory,

        /// Abbreviated nightly hash (required for bug reports)
        #[arg(long, required_if_eq("category", "bug"))]
        hash: Option<String>,

        /// Reporter login used in the nudge message
        #[arg(long, default_value = "reporter")]
        creator: String,

        /// File containing the issue body, or - for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut config = TriageConfig::load(cli.config.as_deref())?.with_env_overrides();
    if let Some(repo) = cli.repo {
        config.repository = repo;
    }

    match cli.command {
        Commands::Run { dry_run } => {
            let trigger = Trigger::from_env().context("Failed to read the triggering event")?;
            let orchestrator = build_orchestrator(&config, cli.token.as_deref(), dry_run)?;
            let report = orchestrator.run(&trigger, chrono::Utc::now()).await;
            print_report(&report, cli.format)?;
        }
        Commands::Sweep { dry_run } => {
            let orchestrator = build_orchestrator(&config, cli.token.as_deref(), dry_run)?;
            let report = orchestrator.run(&Trigger::Schedule, chrono::Utc::now()).await;
            print_report(&report, cli.format)?;
        }
        Commands::Check {
            category,
            hash,
            creator,
            input,
        } => {
            let hash = hash.unwrap_or_default();
            run_check(&config, category, &hash, &creator, &input, cli.format)?;
        }
    }

    Ok(())
}

fn build_orchestrator(
    config: &TriageConfig,
    token: Option<&str>,
    dry_run: bool,
) -> Result<Orchestrator> {
    config.validate()?;
    let token = token.ok_or_else(|| anyhow!("GITHUB_TOKEN is not set (use --token)"))?;
    let (owner, repo) = config.owner_repo()?;

    let github = GitHubTracker::new(&config.api_url, token, owner, repo)
        .context("Failed to create GitHub client")?
        .with_automation_actors(config.automation_actors.clone());

    let tracker: Arc<dyn IssueTracker> = if dry_run {
        info!("Dry run: no labels, comments or issues will be modified");
        Arc::new(DryRunTracker::new(github))
    } else {
        Arc::new(github)
    };

    Ok(Orchestrator::new(tracker, config)?)
}

fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => match report {
            RunReport::Aborted { reason } => println!("Aborted: {reason}"),
            RunReport::Issue { number, outcome } => println!("Issue #{number}: {outcome:?}"),
            RunReport::Sweep(sweep) => {
                println!(
                    "Examined {} issue(s), closed {}",
                    sweep.examined,
                    sweep.closed.len()
                );
                for number in &sweep.closed {
                    println!("  closed #{number}");
                }
                for failure in &sweep.failures {
                    match failure.issue {
                        Some(number) => println!("  failed #{number}: {}", failure.error),
                        None => println!("  failed: {}", failure.error),
                    }
                }
            }
            RunReport::Skipped { event } => println!("Nothing to do for '{event}' events"),
        },
    }

    Ok(())
}

fn run_check(
    config: &TriageConfig,
    category: IssueCategory,
    hash: &str,
    creator: &str,
    input: &Path,
    format: OutputFormat,
) -> Result<()> {
    let body = if input.as_os_str() == "-" {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .context("Failed to read issue body from stdin")?;
        body
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))?
    };

    let validator = Validator::new(config)?;
    let missing = validator.missing_markers(&body, hash, category);
    let verdict = validator.check(creator, &body, hash, category);

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "category": category,
                "compliant": verdict.is_compliant(),
                "missing": missing,
                "message": verdict.message(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            if verdict.is_compliant() {
                println!("✅ Issue follows the {} template", category.as_str());
            } else {
                println!("❌ Issue does not follow the {} template", category.as_str());
                for marker in &missing {
                    println!("   missing: {}", marker.describe());
                }
                if let Some(message) = verdict.message() {
                    println!("\n{message}");
                }
            }
        }
    }

    Ok(())
}
