//! # bindcfg-cli — Binding Ruleset Tool
//!
//! Runs the policy pipeline over rule files from the command line.
//!
//! ## Subcommands
//!
//! - `bindcfg check`: resolve and print diagnostics; exit 1 on errors.
//! - `bindcfg order`: print the module generation order.
//! - `bindcfg explain`: list the directives bearing on one name.
//! - `bindcfg fingerprint`: print the resolved policy's digest.
//! - `bindcfg render`: re-emit parsed rule files.
//!
//! ```bash
//! bindcfg check rules/*.rules --inputs build/inputs.yaml --strict
//! bindcfg explain rules/*.rules --name Geom_Curve::Reverse
//! ```
//!
//! ## Crate Policy
//!
//! Handlers parse arguments and format output; resolution lives in
//! `bindcfg-policy`.

pub mod check;
pub mod explain;
pub mod fingerprint;
pub mod order;
pub mod render;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use bindcfg_policy::{Engine, EngineConfig, GenerationInputs, PolicyError, ResolvedPolicy};

/// Rule files and generation inputs shared by the resolving subcommands.
#[derive(Args, Debug, Clone)]
pub struct RulesArgs {
    /// Rule files, resolved in the order given.
    #[arg(value_name = "RULES", required = true)]
    pub rules: Vec<PathBuf>,

    /// Generation inputs (modules, dependencies, symbols) as YAML or JSON.
    #[arg(long, value_name = "FILE")]
    pub inputs: Option<PathBuf>,

    /// Resolve strictly regardless of the configuration file.
    #[arg(long)]
    pub strict: bool,

    /// Platform for `@platform` qualified rules.
    #[arg(long)]
    pub platform: Option<String>,
}

/// Load the engine configuration, applying command-line overrides.
pub fn load_config(config: Option<&Path>, args: &RulesArgs) -> Result<EngineConfig> {
    let mut engine_config = match config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load engine configuration {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if args.strict {
        engine_config.strict = true;
    }
    if let Some(platform) = &args.platform {
        engine_config.platform = platform.clone();
    }
    Ok(engine_config)
}

/// Load generation inputs, or empty inputs when none are given.
pub fn load_inputs(args: &RulesArgs) -> Result<GenerationInputs> {
    match &args.inputs {
        Some(path) => GenerationInputs::load(path)
            .with_context(|| format!("failed to load generation inputs {}", path.display())),
        None => Ok(GenerationInputs::default()),
    }
}

/// Outcome of running the pipeline from the command line.
#[derive(Debug)]
pub enum Resolution {
    /// A policy, possibly with warnings.
    Resolved(Box<ResolvedPolicy>),
    /// Strict resolution failed; the diagnostics were printed.
    Failed,
}

/// Resolve the rule files. Failed strict resolutions print their
/// diagnostics to stderr; other failures are errors.
pub fn resolve(config: Option<&Path>, args: &RulesArgs) -> Result<Resolution> {
    let engine = Engine::new(load_config(config, args)?);
    let inputs = load_inputs(args)?;
    match engine.resolve_files(args.rules.as_slice(), &inputs) {
        Ok(policy) => Ok(Resolution::Resolved(Box::new(policy))),
        Err(PolicyError::Diagnostics(diagnostics)) => {
            eprint!("{diagnostics}");
            Ok(Resolution::Failed)
        }
        Err(e) => Err(e).context("policy resolution failed"),
    }
}
