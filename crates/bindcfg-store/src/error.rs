//! Store error types.

use bindcfg_core::{Diagnostic, DiagnosticKind, DirectiveKind, Location};
use thiserror::Error;

/// A directive that would break the precedence invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    /// The directive's source order is not greater than one already applied.
    #[error(
        "{location}: {kind} directive with source order {order} applied after source order {last}"
    )]
    OutOfOrder {
        kind: DirectiveKind,
        order: usize,
        last: usize,
        location: Location,
    },
}

impl ConflictError {
    /// The equivalent diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::OutOfOrder { location, .. } => {
                Diagnostic::error(DiagnosticKind::StoreConflict, self.to_string())
                    .at(location.clone())
            }
        }
    }
}
