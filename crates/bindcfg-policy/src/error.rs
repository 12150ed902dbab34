//! Policy pipeline error types.
//!
//! Resolution problems are collected as [`Diagnostics`]; a strict run that
//! finds any error-severity diagnostic fails with
//! [`PolicyError::Diagnostics`] carrying all of them.

use std::path::PathBuf;

use bindcfg_core::{CanonicalizationError, Diagnostics};
use bindcfg_parser::ParseError;
use thiserror::Error;

/// Errors from configuration loading and policy resolution.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Invalid engine configuration.
    #[error("invalid engine configuration: {0}")]
    Config(String),

    /// Resolution failed; every diagnostic found is included.
    #[error("policy resolution failed:\n{0}")]
    Diagnostics(Diagnostics),

    /// Reading rules failed, or a strict parse stopped at a malformed line.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A configuration or inputs file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// YAML parsing failed.
    #[error("failed to parse YAML at {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// JSON parsing failed.
    #[error("failed to parse JSON at {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Fingerprint canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

impl PolicyError {
    /// The collected diagnostics, for a failed resolution.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Self::Diagnostics(d) => Some(d),
            _ => None,
        }
    }
}

/// Result alias for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

#[cfg(test)]
mod tests {
    use super::*;
    use bindcfg_core::{Diagnostic, DiagnosticKind, Location};

    #[test]
    fn test_diagnostics_display_lists_each() {
        let mut diags = Diagnostics::new();
        diags.push(
            Diagnostic::error(DiagnosticKind::UnbrokenCycle, "edge C -> A has no guard")
                .at(Location::new("rules", 4)),
        );
        let err = PolicyError::Diagnostics(diags);
        let msg = err.to_string();
        assert!(msg.starts_with("policy resolution failed:"));
        assert!(msg.contains("rules:4"));
        assert_eq!(err.diagnostics().map(Diagnostics::len), Some(1));
    }

    #[test]
    fn test_config_error_display() {
        let err = PolicyError::Config("default_symbol_priority must not be negative".into());
        assert!(err.to_string().contains("invalid engine configuration"));
        assert!(err.diagnostics().is_none());
    }
}
