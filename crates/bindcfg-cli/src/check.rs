//! # Check Subcommand
//!
//! Resolves the rule files and prints every diagnostic, sorted by location.
//! Exit code 1 when resolution fails or any error-severity diagnostic
//! remains, 0 otherwise.

use std::path::Path;

use anyhow::Result;
use clap::Args;

use bindcfg_core::Severity;
use bindcfg_policy::ResolvedPolicy;

use crate::{resolve, Resolution, RulesArgs};

/// Arguments for `bindcfg check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub rules: RulesArgs,

    /// Also print informational diagnostics (platform-skipped rules).
    #[arg(long)]
    pub all: bool,
}

/// Diagnostic lines followed by a one-line summary.
pub fn report(policy: &ResolvedPolicy, all: bool) -> String {
    let diagnostics = policy.diagnostics();
    let mut out = String::new();
    for d in diagnostics.sorted() {
        if all || d.severity != Severity::Info {
            out.push_str(&d.to_string());
            out.push('\n');
        }
    }
    out.push_str(&format!(
        "OK: {} directives, {} modules ordered, {} guarded edges, {} warnings\n",
        policy.ruleset().directive_count(),
        policy.generation_order().len(),
        policy.guard_placements().len(),
        diagnostics.with_severity(Severity::Warning).count(),
    ));
    out
}

/// Execute the check subcommand.
pub fn run_check(args: &CheckArgs, config: Option<&Path>) -> Result<u8> {
    let policy = match resolve(config, &args.rules)? {
        Resolution::Resolved(policy) => policy,
        Resolution::Failed => {
            println!("FAIL: policy resolution failed");
            return Ok(1);
        }
    };
    print!("{}", report(&policy, args.all));
    Ok(if policy.diagnostics().has_errors() { 1 } else { 0 })
}
