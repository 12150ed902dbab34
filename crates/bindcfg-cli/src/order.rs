//! # Order Subcommand
//!
//! Prints the module generation order, one module per line, or as a JSON
//! array with `--json`.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use crate::{resolve, Resolution, RulesArgs};

/// Arguments for `bindcfg order`.
#[derive(Args, Debug)]
pub struct OrderArgs {
    #[command(flatten)]
    pub rules: RulesArgs,

    /// Print a JSON array.
    #[arg(long)]
    pub json: bool,
}

/// Execute the order subcommand.
pub fn run_order(args: &OrderArgs, config: Option<&Path>) -> Result<u8> {
    let Resolution::Resolved(policy) = resolve(config, &args.rules)? else {
        return Ok(1);
    };
    let order = policy.generation_order();
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(order).context("failed to serialize generation order")?
        );
    } else {
        for module in order {
            println!("{module}");
        }
    }
    Ok(0)
}
