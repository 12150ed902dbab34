//! # Explain Subcommand
//!
//! Shows every directive that bears on a name, with its status, and the
//! effective answers of the main queries.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use bindcfg_policy::ResolvedPolicy;

use crate::{resolve, Resolution, RulesArgs};

/// Arguments for `bindcfg explain`.
#[derive(Args, Debug)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub rules: RulesArgs,

    /// Qualified name to explain, e.g. `Geom_Curve::Reverse`.
    #[arg(long, value_name = "QNAME")]
    pub name: String,

    /// Print the explanation as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Human-readable explanation with query answers appended.
pub fn describe(policy: &ResolvedPolicy, name: &str) -> String {
    let mut out = policy.explain(name).to_string();
    let answers = [
        ("class excluded", policy.is_class_excluded(name)),
        ("function excluded", policy.is_function_excluded(name)),
        ("immutable", policy.is_immutable(name)),
        ("nodelete", policy.is_no_delete(name)),
    ];
    for (label, value) in answers {
        if value {
            let _ = writeln!(out, "  {label}");
        }
    }
    out
}

/// Execute the explain subcommand.
pub fn run_explain(args: &ExplainArgs, config: Option<&Path>) -> Result<u8> {
    let Resolution::Resolved(policy) = resolve(config, &args.rules)? else {
        return Ok(1);
    };
    if args.json {
        let explanation = policy.explain(&args.name);
        println!(
            "{}",
            serde_json::to_string_pretty(&explanation).context("failed to serialize explanation")?
        );
    } else {
        print!("{}", describe(&policy, &args.name));
    }
    Ok(0)
}
