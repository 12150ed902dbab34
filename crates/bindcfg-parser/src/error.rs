//! Parser error types.

use std::path::PathBuf;

use bindcfg_core::{Diagnostic, DiagnosticKind, Location};
use thiserror::Error;

/// Errors raised while reading or parsing a ruleset.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Unrecognized verb, or a payload that does not fit the verb's shape.
    #[error("{location}: malformed directive {raw:?}: {reason}")]
    MalformedDirective {
        location: Location,
        raw: String,
        reason: String,
    },

    /// A rule source could not be read.
    #[error("failed to read rules at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ParseError {
    /// The equivalent diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::MalformedDirective {
                location,
                raw,
                reason,
            } => Diagnostic::error(DiagnosticKind::MalformedDirective, format!("{reason}: {raw}"))
                .at(location.clone()),
            Self::Io { .. } => Diagnostic::error(DiagnosticKind::MalformedDirective, self.to_string()),
        }
    }
}

/// Result alias for parser operations.
pub type ParseResult<T> = Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display_carries_location() {
        let err = ParseError::MalformedDirective {
            location: Location::new("TKernel.rules", 3),
            raw: "+frob X".into(),
            reason: "unknown verb `+frob`".into(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("TKernel.rules:3:"));
        assert!(msg.contains("+frob X"));
    }

    #[test]
    fn test_to_diagnostic() {
        let err = ParseError::MalformedDirective {
            location: Location::new("a", 1),
            raw: "+sort A: x".into(),
            reason: "expected integer priority".into(),
        };
        let d = err.to_diagnostic();
        assert!(d.is_error());
        assert_eq!(d.kind, DiagnosticKind::MalformedDirective);
        assert_eq!(d.location, Some(Location::new("a", 1)));
    }
}
