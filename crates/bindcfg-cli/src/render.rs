//! # Render Subcommand
//!
//! Parses rule files and prints them back. The default output reproduces
//! every line verbatim; `--canonical` prints each directive, active or
//! commented out, in canonical form and drops everything else.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use bindcfg_parser::{parse_files, ParseMode, Ruleset};

/// Arguments for `bindcfg render`.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Rule files, in order.
    #[arg(value_name = "RULES", required = true)]
    pub rules: Vec<PathBuf>,

    /// Print directives in canonical form only.
    #[arg(long)]
    pub canonical: bool,
}

/// Canonical form of every directive, one per line.
pub fn canonical(ruleset: &Ruleset) -> String {
    ruleset
        .directives()
        .map(|d| format!("{}\n", d.to_line()))
        .collect()
}

/// Execute the render subcommand. Malformed lines are reported on stderr
/// and kept verbatim.
pub fn run_render(args: &RenderArgs) -> Result<u8> {
    let outcome = parse_files(args.rules.as_slice(), ParseMode::Permissive).context("failed to read rule files")?;
    for err in &outcome.errors {
        eprintln!("{}", err.to_diagnostic());
    }
    if args.canonical {
        print!("{}", canonical(&outcome.ruleset));
    } else {
        print!("{}", outcome.ruleset.render());
    }
    Ok(if outcome.is_clean() { 0 } else { 1 })
}
