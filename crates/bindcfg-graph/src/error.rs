//! Resolver error types.

use bindcfg_core::{Diagnostic, DiagnosticKind, Severity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Conditions found by the guard and ordering resolvers. Fatal in strict
/// mode, warnings otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum ResolveError {
    /// A dependency cycle with an unguarded edge.
    #[error("unbroken dependency cycle {}: edge {from} -> {to} has no guard", .cycle.join(" -> "))]
    UnbrokenCycle {
        /// Module whose header includes `to`.
        from: String,
        /// Included module.
        to: String,
        /// Modules on the cycle, starting and ending at `from`.
        cycle: Vec<String>,
    },

    /// Explicit priorities contradict a required dependency.
    #[error(
        "ordering conflict: {dependent} (priority {dependent_priority}) requires {dependency} (priority {dependency_priority})"
    )]
    OrderingConflict {
        /// Module with the lower priority value.
        dependent: String,
        /// Module it requires, directly or transitively.
        dependency: String,
        dependent_priority: i64,
        dependency_priority: i64,
    },
}

impl ResolveError {
    /// The equivalent diagnostic at `severity`.
    pub fn to_diagnostic(&self, severity: Severity) -> Diagnostic {
        let kind = match self {
            Self::UnbrokenCycle { .. } => DiagnosticKind::UnbrokenCycle,
            Self::OrderingConflict { .. } => DiagnosticKind::OrderingConflict,
        };
        Diagnostic::new(severity, kind, self.to_string())
    }
}
