//! # Directive Model
//!
//! A directive is one parsed rule line: a [`DirectiveKind`], a target name,
//! a kind-specific [`Payload`], its position in the ruleset and whether it
//! is active. Commented-out lines parse into inactive directives that are
//! kept for round-trip fidelity but never take part in resolution.
//!
//! ## Surface Syntax
//!
//! Each kind has one leading sign, one verb and one payload shape:
//!
//! | Shape | Form |
//! |-------|------|
//! | bare | `-class Foo` |
//! | colon | `+header Module: Header.hxx` |
//! | arrow | `+pname Foo::Bar-->bar` |
//!
//! [`Directive::to_line`] renders a directive back into that syntax.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NameError;
use crate::name::{normalize, QualifiedName};

/// Every directive kind understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    /// `-module M`
    ModuleExclude,
    /// `-class Q`, optionally `-class@platform Q`
    ClassExclude,
    /// `-function Q`, optionally `-function@platform Q`
    FunctionExclude,
    /// `-function* Name`: a base name excluded in every scope.
    FunctionNameExclude,
    /// `-rtype Pattern`: functions whose return type matches are excluded.
    ReturnTypeExclude,
    /// `-enum Q`
    EnumExclude,
    /// `-typedef Q`
    TypedefExclude,
    /// `-field Q`
    FieldExclude,
    /// `+header M: H`
    HeaderAdd,
    /// `-header M: H`
    HeaderRemove,
    /// `-header* H`: never include `H` in any module.
    HeaderBan,
    /// `+immutable T`
    Immutable,
    /// `+nodelete T`
    NoDelete,
    /// `+pname Q-->name`
    PyNameOverride,
    /// `+sort M: N`
    SortPriority,
    /// `+sort M: pattern=N`: ordering of symbols inside one module.
    SymbolPriority,
    /// `+iguard M|T: M`
    ImportGuard,
    /// `+cguard Q-->M`
    CallGuard,
    /// `-import M: M`: drop a dependency edge.
    ImportExclude,
    /// `-base Q: Base`
    BaseExclude,
    /// `+comment M: text`
    TopComment,
    /// `+return_policy Q-->policy`
    ReturnPolicy,
    /// `+keep_alive Q-->params`
    KeepAlive,
    /// `+before_module M-->text`
    BeforeModule,
    /// `+before_type T-->text`
    BeforeType,
    /// `+after_type T-->text`
    AfterType,
    /// `+patch M: find-->replace`: text replacement in a generated module.
    Patch,
    /// `+split M`
    Split,
    /// `+opaque T`
    Opaque,
    /// `+nested T`
    Nested,
    /// `+downcast T`
    Downcast,
    /// `+skip Q`
    Skip,
    /// `+include dir`
    IncludeDir,
    /// `+arg platform: arg`
    CompilerArg,
}

/// How directives of one kind and key combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// The active directive with the greatest source order wins.
    Exclusive,
    /// Every active directive is kept, in source order.
    Accumulating,
}

/// Textual layout of a directive after its verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Target only.
    Bare,
    /// `target: payload`
    Colon,
    /// `target-->payload`
    Arrow,
}

impl DirectiveKind {
    /// All kinds, in declaration order.
    pub const ALL: &'static [DirectiveKind] = &[
        Self::ModuleExclude,
        Self::ClassExclude,
        Self::FunctionExclude,
        Self::FunctionNameExclude,
        Self::ReturnTypeExclude,
        Self::EnumExclude,
        Self::TypedefExclude,
        Self::FieldExclude,
        Self::HeaderAdd,
        Self::HeaderRemove,
        Self::HeaderBan,
        Self::Immutable,
        Self::NoDelete,
        Self::PyNameOverride,
        Self::SortPriority,
        Self::SymbolPriority,
        Self::ImportGuard,
        Self::CallGuard,
        Self::ImportExclude,
        Self::BaseExclude,
        Self::TopComment,
        Self::ReturnPolicy,
        Self::KeepAlive,
        Self::BeforeModule,
        Self::BeforeType,
        Self::AfterType,
        Self::Patch,
        Self::Split,
        Self::Opaque,
        Self::Nested,
        Self::Downcast,
        Self::Skip,
        Self::IncludeDir,
        Self::CompilerArg,
    ];

    /// Leading sign character.
    pub fn sign(&self) -> char {
        match self {
            Self::ModuleExclude
            | Self::ClassExclude
            | Self::FunctionExclude
            | Self::FunctionNameExclude
            | Self::ReturnTypeExclude
            | Self::EnumExclude
            | Self::TypedefExclude
            | Self::FieldExclude
            | Self::HeaderRemove
            | Self::HeaderBan
            | Self::ImportExclude
            | Self::BaseExclude => '-',
            _ => '+',
        }
    }

    /// Verb as written after the sign.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::ModuleExclude => "module",
            Self::ClassExclude => "class",
            Self::FunctionExclude => "function",
            Self::FunctionNameExclude => "function*",
            Self::ReturnTypeExclude => "rtype",
            Self::EnumExclude => "enum",
            Self::TypedefExclude => "typedef",
            Self::FieldExclude => "field",
            Self::HeaderAdd | Self::HeaderRemove => "header",
            Self::HeaderBan => "header*",
            Self::Immutable => "immutable",
            Self::NoDelete => "nodelete",
            Self::PyNameOverride => "pname",
            Self::SortPriority | Self::SymbolPriority => "sort",
            Self::ImportGuard => "iguard",
            Self::CallGuard => "cguard",
            Self::ImportExclude => "import",
            Self::BaseExclude => "base",
            Self::TopComment => "comment",
            Self::ReturnPolicy => "return_policy",
            Self::KeepAlive => "keep_alive",
            Self::BeforeModule => "before_module",
            Self::BeforeType => "before_type",
            Self::AfterType => "after_type",
            Self::Patch => "patch",
            Self::Split => "split",
            Self::Opaque => "opaque",
            Self::Nested => "nested",
            Self::Downcast => "downcast",
            Self::Skip => "skip",
            Self::IncludeDir => "include",
            Self::CompilerArg => "arg",
        }
    }

    /// Canonical payload layout.
    pub fn shape(&self) -> Shape {
        match self {
            Self::HeaderAdd
            | Self::HeaderRemove
            | Self::SortPriority
            | Self::SymbolPriority
            | Self::ImportGuard
            | Self::ImportExclude
            | Self::BaseExclude
            | Self::TopComment
            | Self::Patch
            | Self::CompilerArg => Shape::Colon,
            Self::PyNameOverride
            | Self::CallGuard
            | Self::ReturnPolicy
            | Self::KeepAlive
            | Self::BeforeModule
            | Self::BeforeType
            | Self::AfterType => Shape::Arrow,
            _ => Shape::Bare,
        }
    }

    /// Whether a later directive replaces or joins an earlier one.
    pub fn resolution(&self) -> Resolution {
        match self {
            Self::ModuleExclude
            | Self::ClassExclude
            | Self::FunctionExclude
            | Self::FunctionNameExclude
            | Self::ReturnTypeExclude
            | Self::EnumExclude
            | Self::TypedefExclude
            | Self::FieldExclude
            | Self::PyNameOverride
            | Self::SortPriority
            | Self::ReturnPolicy
            | Self::KeepAlive => Resolution::Exclusive,
            _ => Resolution::Accumulating,
        }
    }

    /// Whether the verb accepts an `@platform` qualifier.
    pub fn supports_platform(&self) -> bool {
        matches!(self, Self::ClassExclude | Self::FunctionExclude)
    }

    /// Whether this kind only excludes its target.
    pub fn is_exclusion(&self) -> bool {
        matches!(
            self,
            Self::ModuleExclude
                | Self::ClassExclude
                | Self::FunctionExclude
                | Self::FunctionNameExclude
                | Self::EnumExclude
                | Self::TypedefExclude
                | Self::FieldExclude
        )
    }

    /// snake_case identifier, matching the serde form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModuleExclude => "module_exclude",
            Self::ClassExclude => "class_exclude",
            Self::FunctionExclude => "function_exclude",
            Self::FunctionNameExclude => "function_name_exclude",
            Self::ReturnTypeExclude => "return_type_exclude",
            Self::EnumExclude => "enum_exclude",
            Self::TypedefExclude => "typedef_exclude",
            Self::FieldExclude => "field_exclude",
            Self::HeaderAdd => "header_add",
            Self::HeaderRemove => "header_remove",
            Self::HeaderBan => "header_ban",
            Self::Immutable => "immutable",
            Self::NoDelete => "no_delete",
            Self::PyNameOverride => "py_name_override",
            Self::SortPriority => "sort_priority",
            Self::SymbolPriority => "symbol_priority",
            Self::ImportGuard => "import_guard",
            Self::CallGuard => "call_guard",
            Self::ImportExclude => "import_exclude",
            Self::BaseExclude => "base_exclude",
            Self::TopComment => "top_comment",
            Self::ReturnPolicy => "return_policy",
            Self::KeepAlive => "keep_alive",
            Self::BeforeModule => "before_module",
            Self::BeforeType => "before_type",
            Self::AfterType => "after_type",
            Self::Patch => "patch",
            Self::Split => "split",
            Self::Opaque => "opaque",
            Self::Nested => "nested",
            Self::Downcast => "downcast",
            Self::Skip => "skip",
            Self::IncludeDir => "include_dir",
            Self::CompilerArg => "compiler_arg",
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific data carried after the target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Payload {
    /// Bare directives.
    None,
    /// Header file path.
    Header(String),
    /// Replacement name in the binding layer.
    PythonName(String),
    /// Module generation priority; lower orders earlier.
    Priority(i64),
    /// Symbol priority inside a module: symbols whose spelling contains
    /// `pattern` get `priority`.
    PatternPriority {
        /// Substring matched against symbol spellings.
        pattern: String,
        /// Priority assigned on match.
        priority: i64,
    },
    /// Another module: guard target or excluded import.
    Module(String),
    /// Free text: comments, policies, inserted code, compiler arguments.
    Text(String),
    /// Text replacement applied to generated source.
    Replacement {
        /// Text searched for.
        find: String,
        /// Text put in its place; may be empty.
        replace: String,
    },
}

impl Payload {
    /// Text form of the payload as it appears after `:` or `-->`.
    pub fn as_text(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::Header(s) | Self::PythonName(s) | Self::Module(s) | Self::Text(s) => s.clone(),
            Self::Priority(n) => n.to_string(),
            Self::PatternPriority { pattern, priority } => format!("{pattern}={priority}"),
            Self::Replacement { find, replace } => format!("{find}-->{replace}"),
        }
    }

    /// The referenced module, for guard and import payloads.
    pub fn module(&self) -> Option<&str> {
        match self {
            Self::Module(m) => Some(m),
            _ => None,
        }
    }

    /// The numeric priority, if any.
    pub fn priority(&self) -> Option<i64> {
        match self {
            Self::Priority(n) | Self::PatternPriority { priority: n, .. } => Some(*n),
            _ => None,
        }
    }
}

/// Where a line came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    /// Source name (file path or rule block label).
    pub source: String,
    /// 1-based line number within the source.
    pub line: usize,
}

impl Location {
    /// Create a location.
    pub fn new(source: impl Into<String>, line: usize) -> Self {
        Self {
            source: source.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.line)
    }
}

/// One parsed rule line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    /// What the directive does.
    pub kind: DirectiveKind,
    /// Target name as written, trimmed.
    pub target: String,
    /// Kind-specific data.
    pub payload: Payload,
    /// Monotonic position across the whole ruleset; later wins.
    pub source_order: usize,
    /// False for commented-out lines.
    pub active: bool,
    /// Platform qualifier from `-class@platform`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Source position for diagnostics.
    pub location: Location,
}

impl Directive {
    /// Normalized target name.
    ///
    /// # Errors
    ///
    /// Returns [`NameError`] if the target cannot be normalized.
    pub fn target_name(&self) -> Result<QualifiedName, NameError> {
        normalize(&self.target)
    }

    /// Whether this directive is in force for `platform`. Directives without
    /// a qualifier apply everywhere.
    pub fn applies_to(&self, platform: Option<&str>) -> bool {
        match (&self.platform, platform) {
            (None, _) => true,
            (Some(wanted), Some(current)) => wanted == current,
            (Some(_), None) => false,
        }
    }

    /// Render the directive in canonical surface syntax. Inactive
    /// directives are prefixed with `# `.
    pub fn to_line(&self) -> String {
        let platform = self
            .platform
            .as_deref()
            .map(|p| format!("@{p}"))
            .unwrap_or_default();
        let body = match self.kind.shape() {
            Shape::Bare => self.target.clone(),
            Shape::Colon => format!("{}: {}", self.target, self.payload.as_text()),
            Shape::Arrow => format!("{}-->{}", self.target, self.payload.as_text()),
        };
        let line = format!("{}{}{} {}", self.kind.sign(), self.kind.verb(), platform, body);
        if self.active {
            line
        } else {
            format!("# {line}")
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}
