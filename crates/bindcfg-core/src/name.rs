//! # Qualified Names — Normalization and Matching
//!
//! Rule targets and introspected symbols are both scoped C++ identifiers,
//! optionally carrying template arguments and a parenthesized signature:
//!
//! ```text
//! NCollection_DataMap<TheKeyType, TheItemType, Hasher>::Seek
//! gp_Pnt::SetCoord(int, double)
//! BRepMesh_GeomTool::IntLinLin_
//! ```
//!
//! [`normalize`] turns such text into a [`QualifiedName`]: a tagged pattern
//! of exact segments, template-wildcard segments and glob segments. Template
//! argument identifiers are dropped (`Foo<*>`), so a rule written against the
//! template parameters matches every concrete instantiation.
//!
//! ## Invariants
//!
//! - `normalize(key_of(normalize(x))) == normalize(x)` (idempotence).
//! - A name ending in `_` is a [`QualifiedName::Literal`]. The suffix is
//!   part of the identifier: the ruleset uses it for static methods and
//!   other synthetic entries that never appear verbatim in the symbol table.
//! - Matching is total: every pair of names either matches or does not,
//!   no input panics.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NameError;

/// Wildcard rendered in place of template arguments.
pub const TEMPLATE_WILDCARD: &str = "<*>";

/// One `::`-separated component of a scoped name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "segment", content = "text", rename_all = "snake_case")]
pub enum Segment {
    /// Plain identifier, compared byte for byte.
    Exact(String),
    /// Template name whose arguments act as a wildcard. Holds the base name.
    Template(String),
    /// Shell-style pattern (`*`, `?`) matched against the candidate segment.
    Glob(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("operator") {
            return Self::exact_or_glob(raw);
        }
        match raw.find('<') {
            Some(open) => {
                let base = raw[..open].trim();
                if base.contains('*') || base.contains('?') {
                    Self::Glob(format!("{base}{TEMPLATE_WILDCARD}"))
                } else {
                    Self::Template(base.to_string())
                }
            }
            None => Self::exact_or_glob(raw),
        }
    }

    fn exact_or_glob(raw: &str) -> Self {
        if !raw.starts_with("operator") && (raw.contains('*') || raw.contains('?')) {
            Self::Glob(raw.to_string())
        } else {
            Self::Exact(raw.to_string())
        }
    }

    /// Base identifier with any template marker removed.
    pub fn base(&self) -> &str {
        match self {
            Self::Exact(s) | Self::Template(s) => s,
            Self::Glob(p) => p.strip_suffix(TEMPLATE_WILDCARD).unwrap_or(p),
        }
    }

    fn matches(&self, candidate: &Segment) -> bool {
        match (self, candidate) {
            (Self::Glob(pattern), other) => glob_match(pattern, &other.to_string()),
            (rule, other) => rule == other,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(s) | Self::Glob(s) => f.write_str(s),
            Self::Template(base) => write!(f, "{base}{TEMPLATE_WILDCARD}"),
        }
    }
}

/// A normalized scoped name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopedName {
    segments: Vec<Segment>,
    signature: Option<String>,
}

impl ScopedName {
    /// The `::`-separated segments, outermost first.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Parameter list including parentheses, whitespace removed.
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }
}

/// A normalized qualified name: either a scoped pattern or an exact literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualifiedName {
    /// Scope path, base identifier and optional signature.
    Scoped(ScopedName),
    /// Exact string, never normalized (names ending in `_`).
    Literal(String),
}

impl QualifiedName {
    /// Whether any segment is a glob, which rules out direct key lookup.
    pub fn is_pattern(&self) -> bool {
        match self {
            Self::Scoped(s) => s.segments.iter().any(|seg| matches!(seg, Segment::Glob(_))),
            Self::Literal(_) => false,
        }
    }

    /// Stable lookup key. Same as [`key_of`].
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// The same name with its signature dropped, if it has one.
    pub fn without_signature(&self) -> Option<QualifiedName> {
        match self {
            Self::Scoped(s) if s.signature.is_some() => Some(Self::Scoped(ScopedName {
                segments: s.segments.clone(),
                signature: None,
            })),
            _ => None,
        }
    }

    /// Keys under which exact-index entries can match this candidate: the
    /// full key, then the signature-free key.
    pub fn lookup_keys(&self) -> Vec<String> {
        let mut keys = vec![self.key()];
        if let Some(bare) = self.without_signature() {
            keys.push(bare.key());
        }
        keys
    }

    /// Literal form with a trailing `_`, the convention for static methods.
    pub fn static_variant(&self) -> QualifiedName {
        let base = self.without_signature().unwrap_or_else(|| self.clone());
        Self::Literal(format!("{}_", base.key()))
    }

    /// Last segment's base identifier.
    pub fn base_name(&self) -> &str {
        match self {
            Self::Scoped(s) => s.segments.last().map(Segment::base).unwrap_or_default(),
            Self::Literal(l) => l.rsplit("::").next().unwrap_or(l),
        }
    }

    /// Module owning this name, by the wrapped library's naming convention.
    pub fn module(&self) -> String {
        module_of(&self.key()).to_string()
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(l) => f.write_str(l),
            Self::Scoped(s) => {
                for (i, seg) in s.segments.iter().enumerate() {
                    if i > 0 {
                        f.write_str("::")?;
                    }
                    write!(f, "{seg}")?;
                }
                if let Some(sig) = &s.signature {
                    f.write_str(sig)?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for QualifiedName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s)
    }
}

/// Normalize raw name text into a [`QualifiedName`].
///
/// # Errors
///
/// Returns [`NameError`] for empty input, empty scope segments, or
/// unbalanced template brackets.
pub fn normalize(raw: &str) -> Result<QualifiedName, NameError> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("::").unwrap_or(trimmed).trim();
    if trimmed.is_empty() {
        return Err(NameError::Empty);
    }
    if trimmed.ends_with('_') {
        return Ok(QualifiedName::Literal(trimmed.to_string()));
    }

    let (name_part, signature) = split_signature(trimmed);
    let mut segments = Vec::new();
    for piece in split_scope(name_part, trimmed)? {
        if piece.trim().is_empty() {
            return Err(NameError::EmptySegment(trimmed.to_string()));
        }
        segments.push(Segment::parse(piece));
    }
    let signature = signature.map(|s| s.chars().filter(|c| !c.is_whitespace()).collect());

    Ok(QualifiedName::Scoped(ScopedName {
        segments,
        signature,
    }))
}

/// Stable lookup key for a normalized name.
pub fn key_of(name: &QualifiedName) -> String {
    name.key()
}

/// Whether a candidate symbol name satisfies a rule target.
///
/// Template segments match by base name, glob segments by pattern. A rule
/// without a signature matches every overload; a rule with one matches only
/// that overload. Literal rules match by exact key.
pub fn matches(candidate: &QualifiedName, rule: &QualifiedName) -> bool {
    match (rule, candidate) {
        (QualifiedName::Literal(l), c) => *l == c.key(),
        (QualifiedName::Scoped(r), QualifiedName::Scoped(c)) => {
            if r.segments.len() != c.segments.len() {
                return false;
            }
            let signature_ok = match (&r.signature, &c.signature) {
                (None, _) => true,
                (Some(rs), Some(cs)) => rs == cs,
                (Some(_), None) => false,
            };
            signature_ok
                && r
                    .segments
                    .iter()
                    .zip(&c.segments)
                    .all(|(rs, cs)| rs.matches(cs))
        }
        (QualifiedName::Scoped(_), QualifiedName::Literal(_)) => false,
    }
}

/// Module prefix of a symbol or header name: text before the first `_`,
/// else before the first `.`, of the outermost scope segment.
pub fn module_of(name: &str) -> &str {
    let name = name.trim().trim_start_matches("::");
    let head = name.split("::").next().unwrap_or(name);
    let head = head.split('<').next().unwrap_or(head).trim();
    if let Some((module, _)) = head.split_once('_') {
        module
    } else if let Some((module, _)) = head.split_once('.') {
        module
    } else {
        head
    }
}

/// Shell-style wildcard match supporting `*` and `?`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

/// Split `Name(sig)` at the first top-level `(` that is not part of
/// `operator()`.
fn split_signature(raw: &str) -> (&str, Option<&str>) {
    let mut depth = 0i32;
    for (i, ch) in raw.char_indices() {
        match ch {
            '<' if !in_operator(raw, i) => depth += 1,
            '>' if !in_operator(raw, i) => depth -= 1,
            '(' if depth <= 0 => {
                if raw[..i].trim_end().ends_with("operator") && raw[i..].starts_with("()") {
                    continue;
                }
                return (raw[..i].trim_end(), Some(&raw[i..]));
            }
            _ => {}
        }
    }
    (raw, None)
}

/// Split on `::` outside template brackets.
fn split_scope<'a>(name: &'a str, whole: &str) -> Result<Vec<&'a str>, NameError> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    let bytes = name.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'<' if !in_operator(name, i) => depth += 1,
            b'>' if !in_operator(name, i) => {
                depth -= 1;
                if depth < 0 {
                    return Err(NameError::UnbalancedTemplate(whole.to_string()));
                }
            }
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                parts.push(&name[start..i]);
                i += 2;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    if depth != 0 {
        return Err(NameError::UnbalancedTemplate(whole.to_string()));
    }
    parts.push(&name[start..]);
    Ok(parts)
}

/// Whether byte offset `i` falls inside an `operator...` segment, where
/// angle brackets are operator symbols rather than template delimiters.
fn in_operator(s: &str, i: usize) -> bool {
    let segment_start = s[..i].rfind("::").map(|p| p + 2).unwrap_or(0);
    s[segment_start..i].trim_start().starts_with("operator")
}
