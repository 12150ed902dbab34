//! # Resolved Policy — Read-Only Query Facade
//!
//! The value the generation pipeline consults per module and per symbol.
//! Built once by [`crate::Engine`] and immutable afterwards; it is `Send +
//! Sync` and meant to be shared behind an `Arc` by generation workers.
//!
//! Name arguments are raw spellings. A name that does not normalize matches
//! no rule, so every predicate answers `false` for it.
//!
//! ## Fingerprint
//!
//! [`ResolvedPolicy::fingerprint`] digests the active directives in
//! canonical line form and source order, the generation order and the
//! guard placements. Remarks, blank lines and commented-out directives do
//! not change it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use bindcfg_core::{
    glob_match, matches, normalize, sha256_digest, CanonicalBytes, ContentDigest, Diagnostics, Directive,
    DirectiveKind, IntrospectedSymbol, Location, Payload, QualifiedName, SymbolKind,
};
use bindcfg_graph::{order_symbols, GuardEdge, GuardGraph, GuardPlacement, SymbolRule};
use bindcfg_parser::Ruleset;
use bindcfg_store::{target_key, PolicyStore};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::PolicyResult;

/// Platform key of compiler arguments that apply everywhere.
pub const ANY_PLATFORM: &str = "any";

/// Everything the engine hands over to build a policy.
#[derive(Debug)]
pub(crate) struct PolicyParts {
    pub config: EngineConfig,
    pub ruleset: Ruleset,
    pub store: PolicyStore,
    pub order: Vec<String>,
    pub guards: GuardGraph,
    pub placements: Vec<GuardPlacement>,
    pub symbol_rules: BTreeMap<String, Vec<SymbolRule>>,
    pub diagnostics: Diagnostics,
}

/// The finalized, override-resolved policy.
#[derive(Debug, Clone)]
pub struct ResolvedPolicy {
    config: EngineConfig,
    ruleset: Ruleset,
    store: PolicyStore,
    order: Vec<String>,
    guards: GuardGraph,
    placements: Vec<GuardPlacement>,
    symbol_rules: BTreeMap<String, Vec<SymbolRule>>,
    diagnostics: Diagnostics,
    fingerprint: ContentDigest,
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    directives: Vec<String>,
    order: &'a [String],
    placements: &'a [GuardPlacement],
}

impl ResolvedPolicy {
    pub(crate) fn build(parts: PolicyParts) -> PolicyResult<Self> {
        let input = FingerprintInput {
            directives: parts.ruleset.active_directives().map(Directive::to_line).collect(),
            order: &parts.order,
            placements: &parts.placements,
        };
        let fingerprint = sha256_digest(&CanonicalBytes::new(&input)?);
        Ok(Self {
            config: parts.config,
            ruleset: parts.ruleset,
            store: parts.store,
            order: parts.order,
            guards: parts.guards,
            placements: parts.placements,
            symbol_rules: parts.symbol_rules,
            diagnostics: parts.diagnostics,
            fingerprint,
        })
    }

    /// Configuration the policy was resolved under.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The parsed ruleset, verbatim.
    pub fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    /// The underlying store.
    pub fn store(&self) -> &PolicyStore {
        &self.store
    }

    fn name(raw: &str) -> Option<QualifiedName> {
        normalize(raw).ok()
    }

    fn excluded(&self, kind: DirectiveKind, raw: &str) -> bool {
        Self::name(raw).is_some_and(|n| self.store.is_excluded(kind, &n))
    }

    fn any(&self, kind: DirectiveKind, raw: &str) -> bool {
        !self.store.query_all_str(kind, raw).is_empty()
    }

    fn texts(&self, kind: DirectiveKind, raw: &str) -> Vec<String> {
        self.store
            .query_all_str(kind, raw)
            .into_iter()
            .map(|d| d.payload.as_text())
            .collect()
    }

    fn targets(&self, kind: DirectiveKind) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.store
            .directives_of(kind)
            .into_iter()
            .map(|d| d.target.as_str())
            .filter(|t| seen.insert(*t))
            .collect()
    }

    // -- exclusions ------------------------------------------------------

    /// Whether `-module` excludes the module.
    pub fn is_module_excluded(&self, module: &str) -> bool {
        self.excluded(DirectiveKind::ModuleExclude, module)
    }

    /// Whether `-class` excludes the class. Does not consider the owning
    /// module; see [`ResolvedPolicy::is_symbol_excluded`].
    pub fn is_class_excluded(&self, name: &str) -> bool {
        self.excluded(DirectiveKind::ClassExclude, name)
    }

    /// Whether `-function` excludes the function, or `-function*` excludes
    /// its base name.
    pub fn is_function_excluded(&self, name: &str) -> bool {
        let Some(qn) = Self::name(name) else {
            return false;
        };
        self.store.is_excluded(DirectiveKind::FunctionExclude, &qn) || self.base_name_excluded(&qn)
    }

    fn base_name_excluded(&self, name: &QualifiedName) -> bool {
        let base = name.base_name();
        self.store
            .directives_of(DirectiveKind::FunctionNameExclude)
            .iter()
            .any(|d| glob_match(d.target.trim(), base))
    }

    /// Return type patterns from `-rtype`, in declaration order.
    pub fn excluded_return_types(&self) -> Vec<&str> {
        self.targets(DirectiveKind::ReturnTypeExclude)
    }

    /// Whether a `-rtype` pattern matches the return type spelling.
    pub fn is_return_type_excluded(&self, return_type: &str) -> bool {
        let spelling = return_type.trim();
        self.excluded_return_types()
            .into_iter()
            .any(|pattern| glob_match(pattern.trim(), spelling))
    }

    /// Whether `-enum` excludes the enum.
    pub fn is_enum_excluded(&self, name: &str) -> bool {
        self.excluded(DirectiveKind::EnumExclude, name)
    }

    /// Whether `-typedef` excludes the typedef.
    pub fn is_typedef_excluded(&self, name: &str) -> bool {
        self.excluded(DirectiveKind::TypedefExclude, name)
    }

    /// Whether `-field` excludes the data member.
    pub fn is_field_excluded(&self, name: &str) -> bool {
        self.excluded(DirectiveKind::FieldExclude, name)
    }

    /// Whether an introspected symbol is left out of the bindings: its
    /// module is excluded, a rule of the matching kind covers any of its
    /// candidate names, a callable returns an excluded type, or, for
    /// members, the enclosing class is excluded.
    pub fn is_symbol_excluded(&self, symbol: &IntrospectedSymbol) -> bool {
        if self.is_module_excluded(&symbol.module()) {
            return true;
        }
        let Ok(candidates) = symbol.candidates() else {
            return false;
        };
        let kind = match symbol.kind {
            SymbolKind::Class | SymbolKind::ClassTemplate => DirectiveKind::ClassExclude,
            SymbolKind::Function
            | SymbolKind::Method
            | SymbolKind::StaticMethod
            | SymbolKind::Constructor => DirectiveKind::FunctionExclude,
            SymbolKind::Enum => DirectiveKind::EnumExclude,
            SymbolKind::Typedef => DirectiveKind::TypedefExclude,
            SymbolKind::Field => DirectiveKind::FieldExclude,
        };
        if candidates.iter().any(|c| self.store.is_excluded(kind, c)) {
            return true;
        }
        if symbol.kind.is_callable() {
            if candidates.first().is_some_and(|c| self.base_name_excluded(c)) {
                return true;
            }
            if symbol
                .return_type
                .as_deref()
                .is_some_and(|rtype| self.is_return_type_excluded(rtype))
            {
                return true;
            }
        }
        match symbol.kind {
            SymbolKind::Class | SymbolKind::ClassTemplate => false,
            _ => enclosing_scope(&symbol.name).is_some_and(|owner| self.is_class_excluded(owner)),
        }
    }

    // -- headers ---------------------------------------------------------

    /// Headers added to a module by `+header`, minus those removed by
    /// `-header` or banned by `-header*`, first occurrence kept.
    pub fn extra_headers(&self, module: &str) -> Vec<String> {
        let removed: BTreeSet<String> = self.excluded_headers(module).into_iter().collect();
        let banned: BTreeSet<&str> = self.banned_headers().into_iter().collect();
        let mut seen = BTreeSet::new();
        self.texts(DirectiveKind::HeaderAdd, module)
            .into_iter()
            .filter(|h| !removed.contains(h) && !banned.contains(h.as_str()))
            .filter(|h| seen.insert(h.clone()))
            .collect()
    }

    /// Headers removed from a module by `-header`.
    pub fn excluded_headers(&self, module: &str) -> Vec<String> {
        self.texts(DirectiveKind::HeaderRemove, module)
    }

    /// Headers banned everywhere by `-header*`.
    pub fn banned_headers(&self) -> Vec<&str> {
        self.targets(DirectiveKind::HeaderBan)
    }

    // -- type classification ----------------------------------------------

    /// Types marked `+immutable`, in declaration order.
    pub fn immutable_types(&self) -> Vec<&str> {
        self.targets(DirectiveKind::Immutable)
    }

    /// Whether the type is marked `+immutable`.
    pub fn is_immutable(&self, name: &str) -> bool {
        self.any(DirectiveKind::Immutable, name)
    }

    /// Types marked `+nodelete`, in declaration order.
    pub fn no_delete_types(&self) -> Vec<&str> {
        self.targets(DirectiveKind::NoDelete)
    }

    /// Whether the type is marked `+nodelete`.
    pub fn is_no_delete(&self, name: &str) -> bool {
        self.any(DirectiveKind::NoDelete, name)
    }

    /// Whether the type is marked `+opaque`.
    pub fn is_opaque(&self, name: &str) -> bool {
        self.any(DirectiveKind::Opaque, name)
    }

    /// Whether the type is marked `+nested`.
    pub fn is_nested(&self, name: &str) -> bool {
        self.any(DirectiveKind::Nested, name)
    }

    /// Whether the type is marked `+downcast`.
    pub fn is_downcast(&self, name: &str) -> bool {
        self.any(DirectiveKind::Downcast, name)
    }

    /// Base classes hidden from a class by `-base`.
    pub fn excluded_bases(&self, class: &str) -> Vec<String> {
        self.texts(DirectiveKind::BaseExclude, class)
    }

    // -- naming and call policies -------------------------------------------

    /// Binding-layer name set by the last `+pname` for the symbol.
    pub fn python_name_override(&self, name: &str) -> Option<String> {
        let qn = Self::name(name)?;
        self.store
            .query(DirectiveKind::PyNameOverride, &qn)
            .map(|d| d.payload.as_text())
    }

    /// Return value policy set by `+return_policy`.
    pub fn return_policy(&self, name: &str) -> Option<String> {
        let qn = Self::name(name)?;
        self.store
            .query(DirectiveKind::ReturnPolicy, &qn)
            .map(|d| d.payload.as_text())
    }

    /// Keep-alive parameters set by `+keep_alive`.
    pub fn keep_alive(&self, name: &str) -> Option<String> {
        let qn = Self::name(name)?;
        self.store
            .query(DirectiveKind::KeepAlive, &qn)
            .map(|d| d.payload.as_text())
    }

    // -- modules -----------------------------------------------------------

    /// `+comment` lines of a module joined with `\n`; `None` without any.
    pub fn top_comment(&self, module: &str) -> Option<String> {
        let lines = self.texts(DirectiveKind::TopComment, module);
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    /// Code inserted ahead of a module by `+before_module`, in order.
    pub fn before_module(&self, module: &str) -> Vec<String> {
        self.texts(DirectiveKind::BeforeModule, module)
    }

    /// Text inserted ahead of a type's binding by `+before_type`, in order.
    pub fn before_type(&self, name: &str) -> Vec<String> {
        self.texts(DirectiveKind::BeforeType, name)
    }

    /// Text appended after a type's binding by `+after_type`, in order.
    pub fn after_type(&self, name: &str) -> Vec<String> {
        self.texts(DirectiveKind::AfterType, name)
    }

    /// `+patch` replacements for a module's generated source, as
    /// `(find, replace)` pairs in declaration order.
    pub fn patches(&self, module: &str) -> Vec<(String, String)> {
        self.store
            .query_all_str(DirectiveKind::Patch, module)
            .into_iter()
            .filter_map(|d| match &d.payload {
                Payload::Replacement { find, replace } => Some((find.clone(), replace.clone())),
                _ => None,
            })
            .collect()
    }

    /// Apply the module's `+patch` replacements to generated source, each
    /// replacing every occurrence, in declaration order.
    pub fn patch_source(&self, module: &str, source: &str) -> String {
        self.patches(module)
            .into_iter()
            .fold(source.to_string(), |text, (find, replace)| text.replace(&find, &replace))
    }

    /// Whether `+split` asks for the module to be emitted in parts.
    pub fn is_split(&self, module: &str) -> bool {
        self.any(DirectiveKind::Split, module)
    }

    /// Whether `+skip` removes the binder for the name.
    pub fn is_skipped(&self, name: &str) -> bool {
        self.any(DirectiveKind::Skip, name)
    }

    /// Guards whose reference starts in `module`.
    pub fn guards_for(&self, module: &str) -> Vec<&GuardEdge> {
        self.guards.guards_for(module)
    }

    /// Placement decided for every guarded edge, ordered by `(from, to)`.
    pub fn guard_placements(&self) -> &[GuardPlacement] {
        &self.placements
    }

    /// Modules in generation order. Excluded modules are absent.
    pub fn generation_order(&self) -> &[String] {
        &self.order
    }

    /// Symbols of one module in generation order, per the module's
    /// `+sort M: pattern=N` rules.
    pub fn symbol_order<S: AsRef<str>>(&self, module: &str, symbols: &[S]) -> Vec<String> {
        let rules = self.symbol_rules.get(module).map(Vec::as_slice).unwrap_or_default();
        order_symbols(rules, symbols, self.config.default_symbol_priority)
    }

    // -- build settings ------------------------------------------------------

    /// Include directories from `+include`, in order.
    pub fn include_dirs(&self) -> Vec<&str> {
        self.targets(DirectiveKind::IncludeDir)
    }

    /// Compiler arguments for `platform`: the `any` ones, then the
    /// platform's own, each in declaration order.
    pub fn compiler_args(&self, platform: &str) -> Vec<String> {
        self.store
            .directives_of(DirectiveKind::CompilerArg)
            .into_iter()
            .filter(|d| {
                let target = d.target.trim();
                target == ANY_PLATFORM || target == platform
            })
            .map(|d| (d.target.trim() != ANY_PLATFORM, d.source_order, d.payload.as_text()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|(_, _, arg)| arg)
            .collect()
    }

    // -- reporting -------------------------------------------------------------

    /// Warnings and notes collected during resolution.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Every directive bearing on `name`, with its status.
    pub fn explain(&self, name: &str) -> Explanation {
        let qn = Self::name(name);
        let key = qn.as_ref().map(QualifiedName::key).unwrap_or_else(|| name.trim().to_string());
        let overridden: BTreeSet<usize> = self.store.overridden().iter().map(|d| d.source_order).collect();

        let mut entries: Vec<ExplainedDirective> = match &qn {
            Some(q) => self
                .store
                .affecting(q)
                .into_iter()
                .map(|d| {
                    let status = if overridden.contains(&d.source_order) {
                        DirectiveStatus::Overridden
                    } else {
                        DirectiveStatus::Effective
                    };
                    ExplainedDirective::new(d, status)
                })
                .collect(),
            None => Vec::new(),
        };
        entries.extend(
            self.store
                .inert()
                .iter()
                .filter(|d| addresses(d, qn.as_ref(), &key))
                .map(|d| {
                    let status = if d.active {
                        DirectiveStatus::PlatformSkipped
                    } else {
                        DirectiveStatus::Inactive
                    };
                    ExplainedDirective::new(d, status)
                }),
        );
        entries.sort_by_key(|e| e.source_order);

        let module = bindcfg_core::module_of(&key).to_string();
        Explanation {
            module_excluded: self.is_module_excluded(&module),
            name: key,
            module,
            python_name: self.python_name_override(name),
            directives: entries,
        }
    }

    /// Content fingerprint of the resolution.
    pub fn fingerprint(&self) -> &ContentDigest {
        &self.fingerprint
    }
}

fn addresses(directive: &Directive, name: Option<&QualifiedName>, key: &str) -> bool {
    match (target_key(&directive.target), name) {
        ((Some(rule), _), Some(name)) => matches(name, &rule),
        ((_, target), _) => target == key,
    }
}

/// `A::B::c` -> `A::B`. Scope separators inside template arguments are
/// ignored.
fn enclosing_scope(name: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut split = None;
    let bytes = name.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b'(' if depth == 0 => break,
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                split = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    split.map(|at| name[..at].trim()).filter(|s| !s.is_empty())
}

/// Whether a directive currently applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveStatus {
    /// In force.
    Effective,
    /// Lost to a later directive of the same kind and target.
    Overridden,
    /// Commented out.
    Inactive,
    /// Qualified with another platform.
    PlatformSkipped,
}

impl fmt::Display for DirectiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Effective => "effective",
            Self::Overridden => "overridden",
            Self::Inactive => "inactive",
            Self::PlatformSkipped => "platform-skipped",
        })
    }
}

/// One directive in an [`Explanation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplainedDirective {
    pub line: String,
    pub kind: DirectiveKind,
    pub location: Location,
    pub source_order: usize,
    pub status: DirectiveStatus,
}

impl ExplainedDirective {
    fn new(directive: &Directive, status: DirectiveStatus) -> Self {
        Self {
            line: directive.to_line(),
            kind: directive.kind,
            location: directive.location.clone(),
            source_order: directive.source_order,
            status,
        }
    }
}

/// Why a name resolves the way it does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Explanation {
    /// Normalized name.
    pub name: String,
    /// Owning module.
    pub module: String,
    pub module_excluded: bool,
    pub python_name: Option<String>,
    /// Directives addressing the name, in source order.
    pub directives: Vec<ExplainedDirective>,
}

impl Explanation {
    /// Directives currently in force.
    pub fn effective(&self) -> impl Iterator<Item = &ExplainedDirective> {
        self.directives
            .iter()
            .filter(|d| d.status == DirectiveStatus::Effective)
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} (module {})", self.name, self.module)?;
        if self.module_excluded {
            writeln!(f, "  module excluded")?;
        }
        if let Some(py) = &self.python_name {
            writeln!(f, "  binding name: {py}")?;
        }
        if self.directives.is_empty() {
            writeln!(f, "  no directives")?;
        }
        for d in &self.directives {
            writeln!(f, "  {}: {} [{}]", d.location, d.line, d.status)?;
        }
        Ok(())
    }
}
