//! # Fingerprint Subcommand
//!
//! Prints the `sha256:<hex>` digest of the resolved policy. With `--check`,
//! compares it against an expected value instead; a mismatch exits 1.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use bindcfg_core::ContentDigest;

use crate::{resolve, Resolution, RulesArgs};

/// Arguments for `bindcfg fingerprint`.
#[derive(Args, Debug)]
pub struct FingerprintArgs {
    #[command(flatten)]
    pub rules: RulesArgs,

    /// Expected fingerprint, with or without the `sha256:` prefix.
    #[arg(long, value_name = "DIGEST")]
    pub check: Option<String>,
}

/// Execute the fingerprint subcommand.
pub fn run_fingerprint(args: &FingerprintArgs, config: Option<&Path>) -> Result<u8> {
    let Resolution::Resolved(policy) = resolve(config, &args.rules)? else {
        return Ok(1);
    };
    let digest = policy.fingerprint();
    match &args.check {
        None => {
            println!("{digest}");
            Ok(0)
        }
        Some(expected) => {
            let expected: ContentDigest = expected.parse().context("invalid --check value")?;
            if expected == *digest {
                println!("OK: fingerprint matches {digest}");
                Ok(0)
            } else {
                println!("FAIL: fingerprint mismatch: expected {expected}, got {digest}");
                Ok(1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;

    #[test]
    fn test_check_against_own_digest() {
        let dir = tempfile::tempdir().unwrap();
        let rules = rules_args(&dir, "-class Foo\n");
        let Resolution::Resolved(policy) = resolve(None, &rules).unwrap() else {
            panic!("expected a policy");
        };
        let good = FingerprintArgs {
            rules: rules.clone(),
            check: Some(policy.fingerprint().to_string()),
        };
        assert_eq!(run_fingerprint(&good, None).unwrap(), 0);

        let bad = FingerprintArgs {
            rules,
            check: Some("0".repeat(64)),
        };
        assert_eq!(run_fingerprint(&bad, None).unwrap(), 1);
    }

    #[test]
    fn test_malformed_check_value_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = FingerprintArgs {
            rules: rules_args(&dir, "-class Foo\n"),
            check: Some("sha256:nothex".into()),
        };
        assert!(run_fingerprint(&args, None).is_err());
    }
}
