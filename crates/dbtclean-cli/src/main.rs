use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use colored::Colorize;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dbtclean_catalog::SnowflakeAdapter;
use dbtclean_core::{CleanReport, Config, ConfigError, Credentials, Profiles, RoleSet, Severity};
use dbtclean_dbt::{DbtCommandRunner, ManifestReader};
use dbtclean_engine::{
    is_affirmative, AutoApprove, CleanPipeline, CleanRun, ConfirmationGate, OrphanSet,
};

/// dbtclean - Drop warehouse objects no longer declared by your dbt project
#[derive(Parser, Debug)]
#[command(name = "dbtclean")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// dbt target whose database is cleaned
    #[arg(short, long)]
    target: String,

    /// dbt profile (project) name in profiles.yml
    #[arg(short, long)]
    project: String,

    /// Extra owner roles, added to dbt_funcrole
    #[arg(short, long, num_args = 1.., action = ArgAction::Append)]
    roles: Vec<String>,

    /// Path to profiles.yml (default: from config, then ./profiles.yml)
    #[arg(long)]
    profiles: Option<PathBuf>,

    /// Path to config file (default: dbtclean.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// dbt project directory
    #[arg(long)]
    project_dir: Option<PathBuf>,

    /// Drop without asking for confirmation
    #[arg(long)]
    yes: bool,

    /// Only list what would be dropped
    #[arg(long, conflicts_with = "yes")]
    dry_run: bool,

    /// Write a JSON clean report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A local .env never overrides variables already set
    dotenvy::dotenv().ok();

    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    let credentials = match Credentials::from_env() {
        Ok(credentials) => credentials,
        Err(ConfigError::CredentialsMissing { missing }) => {
            eprintln!("{} {}", "Missing:".red().bold(), missing.join(", "));
            eprintln!("{}", "Provide the snowflake credentials for your dbt user".yellow());
            eprintln!("Read the help docs with {}", "dbtclean --help".bold());
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };
    tracing::debug!(?credentials, "loaded credentials");

    clean_command(&cli, &config, &credentials).await
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    let config = if let Some(config_path) = path {
        Config::from_file(config_path)?
    } else if Path::new("dbtclean.toml").exists() {
        Config::from_file(Path::new("dbtclean.toml"))?
    } else {
        if verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };
    Ok(config)
}

/// Default role, then config roles, then command-line roles
fn role_set(config: &Config, cli_roles: &[String]) -> RoleSet {
    RoleSet::with_default()
        .extend(&config.roles)
        .extend(cli_roles)
}

/// Directory passed to `dbt --profiles-dir` for a profiles.yml path
fn profiles_dir(profiles: &Path) -> PathBuf {
    match profiles.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Operator-facing line naming the owner roles of a run
fn roles_banner(roles: &RoleSet) -> String {
    format!(
        "Running dbt clean with the following roles: [{}]",
        roles.to_vec().join(", ")
    )
}

async fn clean_command(cli: &Cli, config: &Config, credentials: &Credentials) -> Result<()> {
    let profiles_path = cli.profiles.clone().unwrap_or_else(|| config.dbt.profiles.clone());
    let profiles = Profiles::from_file(&profiles_path)
        .with_context(|| format!("Failed to load dbt profiles from {}", profiles_path.display()))?;
    let database = profiles.resolve_database(&cli.project, &cli.target)?;
    let roles = role_set(config, &cli.roles);

    println!("{}", roles_banner(&roles).cyan());
    if cli.verbose {
        eprintln!("{} {}", "Target database:".cyan(), database);
    }

    let mut runner = DbtCommandRunner::new(&config.dbt.executable)
        .with_target(&cli.target)
        .with_profiles_dir(profiles_dir(&profiles_path));
    if let Some(dir) = cli.project_dir.as_ref().or(config.dbt.project_dir.as_ref()) {
        runner = runner.with_project_dir(dir);
    }

    let adapter = SnowflakeAdapter::from_credentials(credentials)
        .with_warehouse(&config.warehouse.name)
        .with_database(&database)
        .build()
        .context("Failed to open a Snowflake session")?;

    let pipeline = CleanPipeline::new(ManifestReader::new(runner), &adapter, &database, roles)
        .with_dry_run(cli.dry_run);

    let mut gate: Box<dyn ConfirmationGate> = if cli.yes {
        Box::new(AutoApprove)
    } else {
        Box::new(TerminalConfirmation)
    };

    match pipeline.run(gate.as_mut()).await? {
        CleanRun::NothingToClean { unsupported } => {
            for object in &unsupported {
                println!(
                    "{} {} ({}) is not declared but cannot be dropped",
                    "Skipped:".yellow(),
                    object.identifier,
                    object.warehouse_kind
                );
            }
            println!("{}", "No cleaning required!".green());
        }
        CleanRun::Cancelled(_) => {
            println!("{}", "dbt cleanup cancelled".yellow());
        }
        CleanRun::DryRun(orphans) => {
            print_dry_run(&orphans);
        }
        CleanRun::Completed(report) => {
            for outcome in &report.outcomes {
                if outcome.is_failure() {
                    println!(
                        "{} {}: {}",
                        "Failed to drop:".red().bold(),
                        outcome.identifier,
                        outcome.detail
                    );
                } else {
                    println!("{} {}", "Deleted model:".green(), outcome.identifier);
                    println!("  {}", outcome.detail);
                }
            }

            print_clean_summary(&report);

            if let Some(path) = &cli.report {
                report
                    .save_to_file(path)
                    .with_context(|| format!("Failed to write report to {}", path.display()))?;
                println!("{} {}", "Report written to:".cyan(), path.display());
            }
        }
    }

    Ok(())
}

/// Prompts on the terminal and reads one line from stdin
struct TerminalConfirmation;

impl ConfirmationGate for TerminalConfirmation {
    fn confirm(&mut self, orphans: &OrphanSet) -> bool {
        println!("{}", "The following tables will be dropped:".bold());
        for orphan in &orphans.deletable {
            println!("  {}", orphan.identifier.to_string().red());
        }
        for object in &orphans.unsupported {
            println!(
                "  {} {} ({})",
                "skipped".yellow(),
                object.identifier,
                object.warehouse_kind
            );
        }

        print!("Enter 'yes' to drop models: ");
        if std::io::stdout().flush().is_err() {
            return false;
        }

        // Runs inside the async pipeline; stdin blocks this worker thread
        let mut answer = String::new();
        let read = tokio::task::block_in_place(|| std::io::stdin().lock().read_line(&mut answer));
        match read {
            Ok(_) => is_affirmative(&answer),
            Err(e) => {
                tracing::warn!(error = %e, "could not read confirmation");
                false
            }
        }
    }
}

fn print_dry_run(orphans: &OrphanSet) {
    if orphans.is_empty() && orphans.unsupported.is_empty() {
        println!("{}", "No cleaning required!".green());
        return;
    }

    println!("{}", "The following tables would be dropped:".bold());
    for orphan in &orphans.deletable {
        println!("  {} {}", orphan.kind, orphan.identifier.to_string().red());
    }
    for object in &orphans.unsupported {
        println!(
            "  {} {} ({})",
            "skipped".yellow(),
            object.identifier,
            object.warehouse_kind
        );
    }
}

/// Print clean summary to stdout
fn print_clean_summary(report: &CleanReport) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "dbt Clean Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Database: {}", report.database);
    println!("Roles:    {}", report.roles.join(", "));
    println!();

    println!("{}", "Summary:".bold());
    println!("  Observed objects: {}", report.summary.observed);
    println!("  Declared objects: {}", report.summary.declared);
    println!("  Orphans:          {}", report.summary.orphans);
    println!("  Dropped:          {}", format!("{}", report.summary.dropped).green());

    if report.summary.failed > 0 {
        println!("  Failed:           {}", format!("{}", report.summary.failed).red().bold());
    } else {
        println!("  Failed:           {}", format!("{}", report.summary.failed).green());
    }
    if report.summary.unsupported > 0 {
        println!("  Unsupported:      {}", format!("{}", report.summary.unsupported).yellow());
    }
    println!();

    let warnings: Vec<_> = report
        .diagnostics
        .iter()
        .filter(|d| d.severity >= Severity::Warn)
        .collect();
    if !warnings.is_empty() {
        println!("{}", "Warnings:".bold());
        for diag in warnings {
            println!("  [{}] {}: {}", "WARN".yellow().bold(), diag.code, diag.message);
            if let Some(detail) = &diag.detail {
                println!("    {}", detail);
            }
        }
        println!();
    }

    if report.has_failures() {
        println!("{}", "Some objects could not be dropped.".yellow().bold());
    } else {
        println!("{}", "Successfully cleaned unused dbt models.".green().bold());
    }

    println!("{}", "=".repeat(60).bright_blue());
}
