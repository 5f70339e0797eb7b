//! # cfscan CLI entry point
//!
//! Parses command-line arguments, installs logging, loads the optional
//! configuration file, and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cfscan_cli::config::CliConfig;
use cfscan_cli::event::{run_event, EventArgs};
use cfscan_cli::rules::{run_rules, RulesArgs};
use cfscan_cli::validate::{run_validate, ValidateArgs, EXIT_ERROR};

/// cfscan: CloudFormation template security validator.
///
/// Checks templates for IAM wildcards, public S3 exposure, open security
/// groups, unprotected databases, IMDSv1, unencrypted volumes, and
/// plaintext Lambda secrets.
#[derive(Parser, Debug)]
#[command(name = "cfscan", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate template files or directories.
    Validate(ValidateArgs),

    /// List the registered rules.
    Rules(RulesArgs),

    /// Validate the objects named by an object-created notification.
    Event(EventArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "cfscan starting");

    let result = CliConfig::load(cli.config.as_deref()).and_then(|config| match &cli.command {
        Commands::Validate(args) => run_validate(args, &config),
        Commands::Rules(args) => run_rules(args, &config),
        Commands::Event(args) => run_event(args, &config),
    });

    ExitCode::from(exit_status(result))
}

/// Exit status for a command outcome; failures are logged.
fn exit_status(result: anyhow::Result<u8>) -> u8 {
    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            EXIT_ERROR
        }
    }
}
