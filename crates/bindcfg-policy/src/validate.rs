//! # Target Validation
//!
//! Checks rule targets against the introspected symbol table. A rule that
//! names nothing the introspector reported is usually a typo or a symbol
//! removed upstream; it is reported as an `UnknownSymbol` warning and never
//! fails resolution.

use std::collections::BTreeSet;

use bindcfg_core::{
    glob_match, matches, Diagnostic, DiagnosticKind, Directive, DirectiveKind, IntrospectedSymbol,
    QualifiedName,
};
use tracing::debug;

/// Kinds whose target is a class, function, enum, typedef or field.
const SYMBOL_KINDS: &[DirectiveKind] = &[
    DirectiveKind::ClassExclude,
    DirectiveKind::FunctionExclude,
    DirectiveKind::FunctionNameExclude,
    DirectiveKind::EnumExclude,
    DirectiveKind::TypedefExclude,
    DirectiveKind::FieldExclude,
    DirectiveKind::Immutable,
    DirectiveKind::NoDelete,
    DirectiveKind::PyNameOverride,
    DirectiveKind::CallGuard,
    DirectiveKind::BaseExclude,
    DirectiveKind::ReturnPolicy,
    DirectiveKind::KeepAlive,
    DirectiveKind::Opaque,
    DirectiveKind::Nested,
    DirectiveKind::Downcast,
    DirectiveKind::BeforeType,
    DirectiveKind::AfterType,
];

/// Every name the symbol table answers to.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    candidates: Vec<QualifiedName>,
    keys: BTreeSet<String>,
    base_names: BTreeSet<String>,
}

impl SymbolIndex {
    /// Index a symbol table. Symbols whose spelling does not normalize are
    /// skipped.
    pub fn new<'a>(symbols: impl IntoIterator<Item = &'a IntrospectedSymbol>) -> Self {
        let mut index = Self::default();
        for symbol in symbols {
            let Ok(candidates) = symbol.candidates() else {
                debug!(name = %symbol.name, "skipping symbol that does not normalize");
                continue;
            };
            for candidate in candidates {
                index.keys.extend(candidate.lookup_keys());
                if symbol.kind.is_callable() {
                    index.base_names.insert(candidate.base_name().to_string());
                }
                index.candidates.push(candidate);
            }
        }
        index
    }

    /// Number of candidate names.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// True for an empty symbol table.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Whether `rule` names at least one known symbol.
    pub fn knows(&self, rule: &QualifiedName) -> bool {
        if !rule.is_pattern() && self.keys.contains(&rule.key()) {
            return true;
        }
        self.candidates.iter().any(|c| matches(c, rule))
    }

    /// Whether any callable has this base name (`-function*` targets).
    pub fn knows_base_name(&self, pattern: &str) -> bool {
        self.base_names.contains(pattern) || self.base_names.iter().any(|b| glob_match(pattern, b))
    }
}

/// `UnknownSymbol` warnings for the active directives whose target matches
/// nothing in `index`.
pub fn unknown_targets<'a>(
    directives: impl IntoIterator<Item = &'a Directive>,
    index: &SymbolIndex,
) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for directive in directives {
        if !directive.active || !SYMBOL_KINDS.contains(&directive.kind) {
            continue;
        }
        let known = if directive.kind == DirectiveKind::FunctionNameExclude {
            index.knows_base_name(directive.target.trim())
        } else {
            match directive.target_name() {
                Ok(rule) => index.knows(&rule),
                Err(_) => false,
            }
        };
        if !known {
            out.push(
                Diagnostic::warning(
                    DiagnosticKind::UnknownSymbol,
                    format!("`{}` matches no introspected symbol", directive.target),
                )
                .at(directive.location.clone()),
            );
        }
    }
    out
}
