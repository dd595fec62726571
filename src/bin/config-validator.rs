//! # Reconciler Configuration Validator
//!
//! Loads the layered reconciler configuration for an environment, validates it,
//! and prints what the services would run with. Exits non-zero on any problem.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use fleet_reconciler::config::{ConfigManager, ReconcilerConfig};

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate fleet reconciler configuration")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment overlay to apply (development, test, production, ...)
    #[arg(short, long, default_value = "development")]
    environment: String,

    /// Configuration directory (default: ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate and print a summary (default)
    Validate,

    /// Print the fully merged configuration
    Show,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    if let Err(e) = run(&cli) {
        error!("Configuration validation failed: {e:#}");
        eprintln!("❌ {e:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let manager =
        ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &cli.environment)
            .with_context(|| format!("loading environment '{}'", cli.environment))?;

    match cli.command {
        Some(Commands::Show) => show(manager.config(), cli.format),
        Some(Commands::Validate) | None => summarize(&manager, cli.format),
    }
}

fn summarize(manager: &ConfigManager, format: OutputFormat) -> Result<()> {
    let config = manager.config();
    let snapshot = config.snapshot().context("building deployment snapshot")?;

    if format == OutputFormat::Json {
        let summary = serde_json::json!({
            "environment": manager.environment(),
            "config_directory": manager.config_directory().display().to_string(),
            "latest_agent_version": snapshot.latest_agent_version.to_string(),
            "min_supported_agent_version": snapshot.min_supported_agent_version.to_string(),
            "maintenance": config.maintenance,
            "cache_refresh": config.cache_refresh,
            "database_url_configured": config.database.database_url().is_some(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("🔧 Fleet reconciler configuration");
    println!("Environment:          {}", manager.environment());
    println!("Config directory:     {}", manager.config_directory().display());
    println!();
    println!("Latest agent version: {}", snapshot.latest_agent_version);
    println!("Minimum supported:    {}", snapshot.min_supported_agent_version);
    println!(
        "Maintenance:          {} every {}s",
        enabled_label(config.maintenance.enabled),
        config.maintenance.interval_seconds
    );
    println!(
        "Cache refresh:        {} every {}s",
        enabled_label(config.cache_refresh.enabled),
        config.cache_refresh.interval_seconds
    );
    println!(
        "Database:             {} (max {} connections)",
        if config.database.database_url().is_some() {
            "configured"
        } else {
            "not configured"
        },
        config.database.max_connections
    );
    println!("Job channel capacity: {}", config.jobs.channel_capacity);
    println!();
    println!("✅ Configuration is valid");
    Ok(())
}

fn show(config: &ReconcilerConfig, format: OutputFormat) -> Result<()> {
    let mut redacted = config.clone();
    if redacted.database.url.is_some() {
        redacted.database.url = Some("<redacted>".to_string());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&redacted)?),
        OutputFormat::Table => println!("{redacted:#?}"),
    }
    Ok(())
}

fn enabled_label(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}
