//! # bindcfg CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bindcfg_cli::check::{run_check, CheckArgs};
use bindcfg_cli::explain::{run_explain, ExplainArgs};
use bindcfg_cli::fingerprint::{run_fingerprint, FingerprintArgs};
use bindcfg_cli::order::{run_order, OrderArgs};
use bindcfg_cli::render::{run_render, RenderArgs};

/// Binding policy resolution for generated C++ bindings.
///
/// Checks customization rulesets, computes the module generation order,
/// explains how a symbol resolves and fingerprints the resolved policy.
#[derive(Parser, Debug)]
#[command(name = "bindcfg", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the engine configuration (YAML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve rule files and report diagnostics.
    Check(CheckArgs),

    /// Print the module generation order.
    Order(OrderArgs),

    /// Show the directives bearing on a qualified name.
    Explain(ExplainArgs),

    /// Print or verify the resolved policy fingerprint.
    Fingerprint(FingerprintArgs),

    /// Re-emit parsed rule files.
    Render(RenderArgs),
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

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "bindcfg starting");

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Check(args) => run_check(&args, config),
        Commands::Order(args) => run_order(&args, config),
        Commands::Explain(args) => run_explain(&args, config),
        Commands::Fingerprint(args) => run_fingerprint(&args, config),
        Commands::Render(args) => run_render(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
