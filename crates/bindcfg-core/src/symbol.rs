//! # Introspected Symbols
//!
//! Symbols reported by the header introspector. The engine never parses
//! headers itself; it only sees the kind and spelling of each symbol.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NameError;
use crate::name::{normalize, QualifiedName};

/// Category of an introspected symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// Non-template class or struct.
    Class,
    /// Class template.
    ClassTemplate,
    /// Free function.
    Function,
    /// Instance method.
    Method,
    /// Static member function. Rules address these with a trailing `_`.
    StaticMethod,
    /// Constructor.
    Constructor,
    /// Enumeration.
    Enum,
    /// Typedef or alias.
    Typedef,
    /// Data member.
    Field,
}

impl SymbolKind {
    /// snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::ClassTemplate => "class_template",
            Self::Function => "function",
            Self::Method => "method",
            Self::StaticMethod => "static_method",
            Self::Constructor => "constructor",
            Self::Enum => "enum",
            Self::Typedef => "typedef",
            Self::Field => "field",
        }
    }

    /// Whether the kind is callable.
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Self::Function | Self::Method | Self::StaticMethod | Self::Constructor
        )
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One symbol as reported by introspection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntrospectedSymbol {
    /// Symbol category.
    pub kind: SymbolKind,
    /// Fully qualified spelling.
    pub name: String,
    /// Parameter list for callables, e.g. `(int,double)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Return type spelling for callables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
}

impl IntrospectedSymbol {
    /// Create a symbol without a signature.
    pub fn new(kind: SymbolKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            signature: None,
            return_type: None,
        }
    }

    /// Attach a signature.
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Attach a return type.
    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    /// Normalized name including the signature when present.
    ///
    /// # Errors
    ///
    /// Returns [`NameError`] if the spelling cannot be normalized.
    pub fn qualified_name(&self) -> Result<QualifiedName, NameError> {
        match &self.signature {
            Some(sig) => normalize(&format!("{}{}", self.name, sig)),
            None => normalize(&self.name),
        }
    }

    /// Every name a rule may use to address this symbol. Static methods are
    /// also reachable through their `_`-suffixed literal form.
    ///
    /// # Errors
    ///
    /// Returns [`NameError`] if the spelling cannot be normalized.
    pub fn candidates(&self) -> Result<Vec<QualifiedName>, NameError> {
        let name = self.qualified_name()?;
        let mut out = vec![name.clone()];
        match self.kind {
            SymbolKind::StaticMethod => out.push(name.static_variant()),
            // Reported without its parameter list; rules usually spell one.
            SymbolKind::ClassTemplate if !self.name.contains('<') => {
                out.push(normalize(&format!("{}{}", self.name, crate::name::TEMPLATE_WILDCARD))?);
            }
            _ => {}
        }
        Ok(out)
    }

    /// Owning module by naming convention.
    pub fn module(&self) -> String {
        crate::name::module_of(&self.name).to_string()
    }
}
