//! Checkwise CLI
//!
//! Runs data-integrity checks and repairs against the routine backend.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use cw_core::entitlements::Feature;
use cw_core::gateway::{EntityGateway, RecordFilter};
use cw_core::integrity::{
    CheckOutcome, ExecutionWindow, IntegrityReport, IntegrityService, Issue, IssueKind,
    RepairReport, RepairStatus,
};
use cw_core::models::User;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod config;
mod validator;

use config::AppConfig;
use validator::ConfigValidator;

#[derive(Parser)]
#[command(name = "checkwise")]
#[command(version)]
#[command(about = "Data-integrity checks and repairs for routine data", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "CHECKWISE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Email of the acting user
    #[arg(long, env = "CHECKWISE_ACTOR")]
    actor: Option<String>,

    /// Backend API key (overrides gateway.api_key)
    #[arg(long, env = "CHECKWISE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run every integrity check
    Check {
        /// Scan all executions instead of the most recent window
        #[arg(long)]
        full_scan: bool,
    },

    /// Repair reported issues of the given kinds, then check again
    Repair {
        /// Issue kind to repair (repeatable)
        #[arg(short, long = "kind", value_name = "KIND", required = true)]
        kinds: Vec<IssueKind>,

        /// Show what would be repaired without writing
        #[arg(long)]
        dry_run: bool,

        /// Scan all executions instead of the most recent window
        #[arg(long)]
        full_scan: bool,
    },

    /// Validate configuration
    Validate {
        /// Configuration file to validate
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show current configuration
    Config {
        /// Show secrets (redacted by default)
        #[arg(long)]
        show_secrets: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = load_config(cli.config.as_deref(), &config_path)?;
    if cli.config.is_none() && !config_path.exists() && cli.verbose {
        eprintln!("Using default configuration (no config file found)");
    }
    if let Some(api_key) = &cli.api_key {
        config.gateway.api_key = api_key.clone();
    }

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    if cli.format == OutputFormat::Json {
        logging.json_format = true;
    }
    cw_observability::init_logging_with_config(&logging);

    match cli.command {
        Commands::Check { full_scan } => {
            let session = Session::start(config, full_scan, cli.actor.as_deref()).await?;
            cmd_check(&session, cli.format).await
        }
        Commands::Repair {
            kinds,
            dry_run,
            full_scan,
        } => {
            let session = Session::start(config, full_scan, cli.actor.as_deref()).await?;
            cmd_repair(&session, &kinds, dry_run, cli.format).await
        }
        Commands::Validate { config: cfg_path } => {
            cmd_validate(cfg_path.unwrap_or(config_path)).await
        }
        Commands::Config { show_secrets } => cmd_config(config, show_secrets, cli.format).await,
    }
}

/// Loads the explicit `--config` file, or the default path when it exists.
/// Only a missing default file falls back to built-in defaults.
fn load_config(explicit: Option<&Path>, default_path: &Path) -> Result<AppConfig> {
    match explicit {
        Some(path) => AppConfig::load(path),
        None if default_path.exists() => AppConfig::load(default_path),
        None => Ok(AppConfig::default()),
    }
}

fn default_config_path() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("com", "checkwise", "checkwise") {
        dirs.config_dir().join("config.yaml")
    } else {
        PathBuf::from("config/checkwise.yaml")
    }
}

/// A connected service plus the resolved acting user.
struct Session {
    service: IntegrityService,
    actor: User,
}

impl Session {
    async fn start(mut config: AppConfig, full_scan: bool, actor: Option<&str>) -> Result<Self> {
        if full_scan {
            config.integrity.execution_window = ExecutionWindow::full();
        }

        let validation = ConfigValidator::validate(&config);
        if validation.has_errors() {
            validation.print();
            bail!("Configuration is invalid, run `checkwise validate` for details");
        }

        let gateway = EntityGateway::rest(&config.gateway.to_rest())
            .context("Failed to create gateway client")?;
        let entitlements = Arc::new(
            config
                .entitlements()
                .context("Failed to build entitlements")?,
        );

        let email = actor.context("No acting user, pass --actor or set CHECKWISE_ACTOR")?;
        let actor = resolve_actor(&gateway, email).await?;
        if !entitlements.is_allowed(&actor, Feature::DataIntegrity) {
            bail!(
                "{} is not entitled to {} (tier {})",
                actor.email,
                Feature::DataIntegrity,
                actor.tier
            );
        }

        let service = IntegrityService::new(gateway, config.integrity, entitlements)?;
        Ok(Self { service, actor })
    }
}

async fn resolve_actor(gateway: &EntityGateway, email: &str) -> Result<User> {
    let users = gateway
        .users
        .filter(&RecordFilter::new().eq("email", email))
        .await
        .with_context(|| format!("Failed to look up acting user {}", email))?;

    users
        .into_iter()
        .next()
        .with_context(|| format!("No user with email {}", email))
}

async fn cmd_check(session: &Session, format: OutputFormat) -> Result<()> {
    let report = session.service.run_checks(&session.actor).await;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

async fn cmd_repair(
    session: &Session,
    kinds: &[IssueKind],
    dry_run: bool,
    format: OutputFormat,
) -> Result<()> {
    let registry = session.service.registry();

    if dry_run {
        let report = session.service.run_checks(&session.actor).await;
        let selected: Vec<&Issue> = report
            .issues()
            .filter(|issue| kinds.contains(&issue.kind()))
            .collect();

        if format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&selected)?);
        } else {
            println!("{}", "Repair Plan (dry run)".bold());
            println!("─────────────────────");
            if selected.is_empty() {
                println!("No matching issues found");
            }
            for issue in selected {
                let plan = if registry.supports(issue.kind()) {
                    "repair".green()
                } else {
                    "unsupported".yellow()
                };
                println!("  [{}] {}", plan, issue);
            }
        }
        return Ok(());
    }

    for kind in kinds.iter().filter(|kind| !registry.supports(**kind)) {
        eprintln!(
            "{}: {} issues have no repair handler and will be left untouched",
            "Note".yellow(),
            kind
        );
    }

    let run = session
        .service
        .repair_and_verify(&session.actor, kinds)
        .await;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print_repair(&run.repair);
        println!();
        println!("{}", "Verification".bold());
        print_report(&run.verification);
    }

    Ok(())
}

fn print_report(report: &IntegrityReport) {
    println!("{}", "Integrity Report".bold());
    println!("────────────────");
    println!(
        "  Run {} at {}",
        report.run_id.to_string()[..8].cyan(),
        report.checked_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();

    for check in &report.checks {
        match &check.outcome {
            CheckOutcome::Completed { issues } if issues.is_empty() => {
                println!("  {} {}", "✓".green(), check.category);
            }
            CheckOutcome::Completed { issues } => {
                println!(
                    "  {} {} ({} issues)",
                    "✗".red(),
                    check.category,
                    issues.len()
                );
                for issue in issues {
                    println!("      - [{}] {}", issue.kind().to_string().cyan(), issue);
                }
            }
            CheckOutcome::Unavailable { reason } => {
                println!(
                    "  {} {} unavailable: {}",
                    "⚠".yellow(),
                    check.category,
                    reason
                );
            }
        }
    }

    println!();
    let summary = report.summary.describe();
    if report.is_clean() {
        println!("{}", summary.green().bold());
    } else {
        println!("{}", summary.yellow().bold());
    }
}

fn print_repair(report: &RepairReport) {
    println!("{}", "Repair Results".bold());
    println!("──────────────");

    for result in &report.results {
        let entity = result.issue.entity_id().cyan();
        match &result.status {
            RepairStatus::Repaired { removed } => {
                println!(
                    "  {} {} removed {}",
                    "✓".green(),
                    entity,
                    removed.join(", ")
                );
            }
            RepairStatus::Skipped { reason } => {
                println!("  {} {} skipped: {}", "-".white(), entity, reason);
            }
            RepairStatus::Unsupported => {
                println!(
                    "  {} {} unsupported ({})",
                    "○".yellow(),
                    entity,
                    result.issue.kind()
                );
            }
            RepairStatus::Failed { error } => {
                println!("  {} {} failed: {}", "✗".red(), entity, error);
            }
        }
    }

    println!();
    let summary = report.summary.describe();
    if report.summary.failed > 0 {
        println!("{}", summary.red().bold());
    } else {
        println!("{}", summary.green().bold());
    }
}

async fn cmd_validate(config_path: PathBuf) -> Result<()> {
    println!(
        "Validating configuration: {}",
        config_path.display().to_string().cyan()
    );

    let config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("{}: {:#}", "Configuration file error".red().bold(), e);
            std::process::exit(1);
        }
    };

    let validation_result = ConfigValidator::validate(&config);
    validation_result.print();

    println!();
    println!("{}", "Configuration Summary".bold());
    println!("─────────────────────");
    println!("  Backend: {}", config.gateway.base_url);
    println!("  App: {}", config.gateway.app_id);
    println!(
        "  Execution window: {}",
        config.integrity.execution_window.describe()
    );
    println!(
        "  Entitlements: {}",
        if config.entitlements.is_some() {
            "custom matrix"
        } else {
            "default matrix"
        }
    );

    if validation_result.has_errors() {
        println!();
        println!(
            "{}",
            "Configuration validation failed. Fix the errors above."
                .red()
                .bold()
        );
        std::process::exit(1);
    } else if validation_result.has_warnings() {
        println!();
        println!(
            "{}",
            "Configuration is valid with warnings. Review the warnings above."
                .yellow()
                .bold()
        );
    } else {
        println!();
        println!("{}", "Configuration is valid.".green().bold());
    }

    Ok(())
}

async fn cmd_config(config: AppConfig, show_secrets: bool, format: OutputFormat) -> Result<()> {
    let display_config = if show_secrets {
        config
    } else {
        config.redact_secrets()
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&display_config)?);
    } else {
        println!("{}", "Current Configuration".bold());
        println!("─────────────────────────");
        print!("{}", serde_yaml::to_string(&display_config)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_explicit_malformed_config_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "gateway: [not, a, mapping").unwrap();

        let err = load_config(Some(file.path()), Path::new("/nonexistent/checkwise.yaml"))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let missing = Path::new("/nonexistent/explicit.yaml");
        let err = load_config(Some(missing), missing).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_missing_default_config_uses_defaults() {
        let config = load_config(None, Path::new("/nonexistent/checkwise.yaml")).unwrap();
        assert_eq!(config.gateway.api_key, AppConfig::default().gateway.api_key);
    }

    #[test]
    fn test_malformed_default_config_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "integrity: {{ execution_window: 42").unwrap();

        assert!(load_config(None, file.path()).is_err());
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_repair_parses_kinds() {
        let cli = Cli::try_parse_from([
            "checkwise",
            "--actor",
            "admin@x.com",
            "repair",
            "--kind",
            "orphaned_user_assignment",
            "-k",
            "orphaned_team_assignment_user",
        ])
        .unwrap();

        match cli.command {
            Commands::Repair { kinds, dry_run, .. } => {
                assert_eq!(
                    kinds,
                    vec![
                        IssueKind::OrphanedUserAssignment,
                        IssueKind::OrphanedTeamAssignmentUser
                    ]
                );
                assert!(!dry_run);
            }
            _ => panic!("expected repair command"),
        }
    }

    #[test]
    fn test_repair_requires_kind() {
        assert!(Cli::try_parse_from(["checkwise", "repair"]).is_err());
        assert!(Cli::try_parse_from(["checkwise", "repair", "--kind", "bogus"]).is_err());
    }

    #[tokio::test]
    async fn test_resolve_actor() {
        let memory = cw_core::gateway::InMemoryGateway::seeded(
            vec![User::new("u1", "admin@x.com")],
            vec![],
            vec![],
            vec![],
        );
        let gateway = memory.gateway();

        let actor = resolve_actor(&gateway, "admin@x.com").await.unwrap();
        assert_eq!(actor.id, "u1");
        assert!(resolve_actor(&gateway, "nobody@x.com").await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_config_does_not_start() {
        let result = Session::start(AppConfig::default(), false, Some("admin@x.com")).await;
        assert!(result.is_err());
    }
}
