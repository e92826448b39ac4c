//! regionfit CLI - pick a deployment region with enough model quota
//!
//! A command-line front end for the region selection engine: checks a
//! primary region, falls back to other candidates when it is short, and
//! reports quota per region.

mod commands;
mod output;
mod prompt;

use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::parser::ValueSource;
use clap::{ArgAction, CommandFactory, FromArgMatches, Parser, Subcommand};
use regionfit_core::config::resolve_config_path;
use regionfit_core::{expand_path, RegionFitConfig};

#[derive(Parser)]
#[command(name = "regionfit")]
#[command(author, version, about = "Pick a deployment region with enough model quota", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: table (default) or json
    #[arg(long, global = true, default_value = "table")]
    format: output::OutputFormat,

    /// Suppress progress messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// More log output (-v info, -vv debug)
    #[arg(long, short, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Config file (or set REGIONFIT_CONFIG env var)
    #[arg(long, env = "REGIONFIT_CONFIG", global = true)]
    config: Option<String>,

    /// Read quota from a JSON fixture instead of the cloud CLI
    #[arg(long, env = "REGIONFIT_QUOTA_FILE", global = true)]
    quota_file: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Select a region for the requested models
    Select(commands::select::SelectArgs),

    /// Show quota for the requested models across regions
    Assess(commands::assess::AssessArgs),

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = Cli::command().get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };
    init_logging(cli.verbose);

    match run(cli, matches.value_source("config")).await {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config_flag: Option<ValueSource>) -> Result<ExitCode> {
    let config = RegionFitConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let config_path = resolve_config_path(cli.config.as_deref());
    let config_source = match config_flag {
        Some(ValueSource::CommandLine) => commands::ConfigSource::Flag,
        Some(ValueSource::EnvVariable) => commands::ConfigSource::Env,
        _ if config_path.is_some() => commands::ConfigSource::Detected,
        _ => commands::ConfigSource::Default,
    };

    // Create context for commands
    let ctx = commands::Context {
        config,
        config_path,
        config_source,
        quota_file: cli.quota_file.as_deref().map(expand_path),
        format: cli.format,
        quiet: cli.quiet,
    };

    // Execute command
    match cli.command {
        Commands::Select(args) => commands::select::execute(&ctx, args).await,
        Commands::Assess(args) => commands::assess::execute(&ctx, args).await,
        Commands::Config { action } => {
            commands::config::execute(&ctx, action).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
