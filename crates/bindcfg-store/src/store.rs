//! # Policy Store
//!
//! Indexed, overridable mapping from `(kind, target key)` to directives.
//!
//! ## Invariants
//!
//! - Exclusive kinds: among active directives with the same kind and key,
//!   the one with the greatest source order wins. Losers are kept in the
//!   overridden list for `explain`.
//! - Accumulating kinds: every active directive is kept; lookups return them
//!   in source order.
//! - Inactive and platform-skipped directives never take part in lookups
//!   and are kept in the inert list.
//! - Source order strictly increases across `apply` calls.
//!
//! Targets containing glob segments cannot be indexed by key; they are kept
//! in a separate list and matched against every lookup.

use std::collections::BTreeMap;

use bindcfg_core::{key_of, matches, normalize, Directive, DirectiveKind, QualifiedName, Resolution};
use tracing::debug;

use crate::error::ConflictError;
use crate::observer::{OverrideObserver, TracingObserver};

type IndexKey = (DirectiveKind, String);

#[derive(Debug, Clone, PartialEq, Eq)]
struct PatternEntry {
    name: QualifiedName,
    directive: Directive,
}

/// The override-resolved directive collection.
#[derive(Debug, Clone, Default)]
pub struct PolicyStore {
    platform: Option<String>,
    exclusive: BTreeMap<IndexKey, Directive>,
    accumulating: BTreeMap<IndexKey, Vec<Directive>>,
    patterns: Vec<PatternEntry>,
    overridden: Vec<Directive>,
    inert: Vec<Directive>,
    last_order: Option<usize>,
}

/// Index key of a directive target. Targets that do not normalize (paths,
/// free text) are keyed by their trimmed text.
pub fn target_key(target: &str) -> (Option<QualifiedName>, String) {
    match normalize(target) {
        Ok(name) => {
            let key = key_of(&name);
            (Some(name), key)
        }
        Err(_) => (None, target.trim().to_string()),
    }
}

impl PolicyStore {
    /// Empty store that applies unqualified directives only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store for a platform; directives qualified with another
    /// platform become inert.
    pub fn for_platform(platform: impl Into<String>) -> Self {
        Self {
            platform: Some(platform.into()),
            ..Self::default()
        }
    }

    /// The configured platform.
    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    /// Insert a directive, logging overrides at debug level.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError::OutOfOrder`] if the source order does not
    /// strictly increase.
    pub fn apply(&mut self, directive: Directive) -> Result<(), ConflictError> {
        self.apply_with(directive, &mut TracingObserver)
    }

    /// Insert a directive, reporting overrides to `observer`.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError::OutOfOrder`] if the source order does not
    /// strictly increase.
    pub fn apply_with(
        &mut self,
        directive: Directive,
        observer: &mut dyn OverrideObserver,
    ) -> Result<(), ConflictError> {
        if let Some(last) = self.last_order {
            if directive.source_order <= last {
                return Err(ConflictError::OutOfOrder {
                    kind: directive.kind,
                    order: directive.source_order,
                    last,
                    location: directive.location.clone(),
                });
            }
        }
        self.last_order = Some(directive.source_order);

        if !directive.active || !directive.applies_to(self.platform.as_deref()) {
            debug!(line = %directive.to_line(), location = %directive.location, "inert directive");
            self.inert.push(directive);
            return Ok(());
        }

        let (name, key) = target_key(&directive.target);
        if let Some(name) = name.filter(QualifiedName::is_pattern) {
            self.apply_pattern(name, directive, observer);
            return Ok(());
        }

        let index = (directive.kind, key);
        match directive.kind.resolution() {
            Resolution::Exclusive => {
                if let Some(previous) = self.exclusive.insert(index, directive.clone()) {
                    observer.on_override(&previous, &directive);
                    self.overridden.push(previous);
                }
            }
            Resolution::Accumulating => {
                self.accumulating.entry(index).or_default().push(directive);
            }
        }
        Ok(())
    }

    fn apply_pattern(
        &mut self,
        name: QualifiedName,
        directive: Directive,
        observer: &mut dyn OverrideObserver,
    ) {
        if directive.kind.resolution() == Resolution::Exclusive {
            let same = self
                .patterns
                .iter()
                .position(|p| p.directive.kind == directive.kind && p.name == name);
            if let Some(pos) = same {
                let previous = self.patterns.remove(pos).directive;
                observer.on_override(&previous, &directive);
                self.overridden.push(previous);
            }
        }
        self.patterns.push(PatternEntry { name, directive });
    }

    /// Winning directive of an exclusive kind for `name`. Exact entries and
    /// matching glob entries compete by source order.
    pub fn query(&self, kind: DirectiveKind, name: &QualifiedName) -> Option<&Directive> {
        let exact = name
            .lookup_keys()
            .into_iter()
            .filter_map(|key| self.exclusive.get(&(kind, key)));
        exact
            .chain(self.matching_patterns(kind, name))
            .max_by_key(|d| d.source_order)
    }

    /// Every active directive of `kind` addressing `name`, in source order.
    pub fn query_all(&self, kind: DirectiveKind, name: &QualifiedName) -> Vec<&Directive> {
        let mut out: Vec<&Directive> = match kind.resolution() {
            Resolution::Exclusive => self.query(kind, name).into_iter().collect(),
            Resolution::Accumulating => name
                .lookup_keys()
                .into_iter()
                .filter_map(|key| self.accumulating.get(&(kind, key)))
                .flatten()
                .chain(self.matching_patterns(kind, name))
                .collect(),
        };
        out.sort_by_key(|d| d.source_order);
        out.dedup_by_key(|d| d.source_order);
        out
    }

    /// Lookup by raw text. Names that fail to normalize match nothing
    /// except an identically written text target.
    pub fn query_all_str(&self, kind: DirectiveKind, raw: &str) -> Vec<&Directive> {
        match normalize(raw) {
            Ok(name) => self.query_all(kind, &name),
            Err(_) => {
                let key = raw.trim().to_string();
                match kind.resolution() {
                    Resolution::Exclusive => {
                        self.exclusive.get(&(kind, key)).into_iter().collect()
                    }
                    Resolution::Accumulating => self
                        .accumulating
                        .get(&(kind, key))
                        .map(|v| v.iter().collect())
                        .unwrap_or_default(),
                }
            }
        }
    }

    /// Whether an active exclusion of `kind` covers `name`.
    pub fn is_excluded(&self, kind: DirectiveKind, name: &QualifiedName) -> bool {
        kind.is_exclusion() && self.query(kind, name).is_some()
    }

    /// Active directives of one kind: winners for exclusive kinds, all for
    /// accumulating kinds. Sorted by source order.
    pub fn directives_of(&self, kind: DirectiveKind) -> Vec<&Directive> {
        let mut out: Vec<&Directive> = match kind.resolution() {
            Resolution::Exclusive => self
                .exclusive
                .range((kind, String::new())..)
                .take_while(|((k, _), _)| *k == kind)
                .map(|(_, d)| d)
                .collect(),
            Resolution::Accumulating => self
                .accumulating
                .range((kind, String::new())..)
                .take_while(|((k, _), _)| *k == kind)
                .flat_map(|(_, v)| v.iter())
                .collect(),
        };
        out.extend(
            self.patterns
                .iter()
                .filter(|p| p.directive.kind == kind)
                .map(|p| &p.directive),
        );
        out.sort_by_key(|d| d.source_order);
        out
    }

    /// Every active directive of every kind addressing `name`, plus the
    /// overridden ones, in source order.
    pub fn affecting(&self, name: &QualifiedName) -> Vec<&Directive> {
        let keys = name.lookup_keys();
        let mut out: Vec<&Directive> = self
            .exclusive
            .iter()
            .filter(|((_, key), _)| keys.contains(key))
            .map(|(_, d)| d)
            .chain(
                self.accumulating
                    .iter()
                    .filter(|((_, key), _)| keys.contains(key))
                    .flat_map(|(_, v)| v.iter()),
            )
            .chain(
                self.patterns
                    .iter()
                    .filter(|p| matches(name, &p.name))
                    .map(|p| &p.directive),
            )
            .chain(self.overridden.iter().filter(|d| addresses(d, name)))
            .collect();
        out.sort_by_key(|d| d.source_order);
        out
    }

    /// Directives that lost to a later one of the same kind and key.
    pub fn overridden(&self) -> &[Directive] {
        &self.overridden
    }

    /// Inactive and platform-skipped directives, in source order.
    pub fn inert(&self) -> &[Directive] {
        &self.inert
    }

    /// Number of active directives held.
    pub fn len(&self) -> usize {
        self.exclusive.len()
            + self.accumulating.values().map(Vec::len).sum::<usize>()
            + self.patterns.len()
    }

    /// True when no active directive is held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matching_patterns(&self, kind: DirectiveKind, name: &QualifiedName) -> Vec<&Directive> {
        self.patterns
            .iter()
            .filter(|p| p.directive.kind == kind && matches(name, &p.name))
            .map(|p| &p.directive)
            .collect()
    }
}

fn addresses(directive: &Directive, name: &QualifiedName) -> bool {
    match target_key(&directive.target) {
        (Some(rule), _) => matches(name, &rule),
        (None, key) => name.key() == key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindcfg_core::{Location, Payload};

    fn d(kind: DirectiveKind, target: &str, payload: Payload, order: usize) -> Directive {
        Directive {
            kind,
            target: target.to_string(),
            payload,
            source_order: order,
            active: true,
            platform: None,
            location: Location::new("t", order + 1),
        }
    }

    fn qn(s: &str) -> QualifiedName {
        normalize(s).unwrap()
    }

    #[test]
    fn test_later_exclusive_wins() {
        let mut store = PolicyStore::new();
        store
            .apply(d(DirectiveKind::PyNameOverride, "Foo", Payload::PythonName("a".into()), 0))
            .unwrap();
        store
            .apply(d(DirectiveKind::PyNameOverride, "Foo", Payload::PythonName("b".into()), 5))
            .unwrap();
        let winner = store.query(DirectiveKind::PyNameOverride, &qn("Foo")).unwrap();
        assert_eq!(winner.payload, Payload::PythonName("b".into()));
        assert_eq!(store.overridden().len(), 1);
    }

    #[test]
    fn test_override_observer_called() {
        let mut store = PolicyStore::new();
        let mut seen = Vec::new();
        let mut observer = |prev: &Directive, win: &Directive| {
            seen.push((prev.source_order, win.source_order));
        };
        store
            .apply_with(d(DirectiveKind::SortPriority, "gp", Payload::Priority(1), 0), &mut observer)
            .unwrap();
        store
            .apply_with(d(DirectiveKind::SortPriority, "gp", Payload::Priority(2), 1), &mut observer)
            .unwrap();
        assert_eq!(seen, vec![(0, 1)]);
    }

    #[test]
    fn test_accumulating_in_source_order() {
        let mut store = PolicyStore::new();
        for (i, h) in ["a.hxx", "b.hxx", "c.hxx"].iter().enumerate() {
            store
                .apply(d(DirectiveKind::HeaderAdd, "Geom", Payload::Header(h.to_string()), i))
                .unwrap();
        }
        let headers: Vec<String> = store
            .query_all(DirectiveKind::HeaderAdd, &qn("Geom"))
            .iter()
            .map(|d| d.payload.as_text())
            .collect();
        assert_eq!(headers, vec!["a.hxx", "b.hxx", "c.hxx"]);
    }

    #[test]
    fn test_inactive_never_participates() {
        let mut store = PolicyStore::new();
        let mut commented = d(DirectiveKind::ClassExclude, "Foo", Payload::None, 0);
        commented.active = false;
        store.apply(commented).unwrap();
        assert!(!store.is_excluded(DirectiveKind::ClassExclude, &qn("Foo")));
        assert_eq!(store.inert().len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_out_of_order_is_conflict() {
        let mut store = PolicyStore::new();
        store.apply(d(DirectiveKind::ClassExclude, "A", Payload::None, 3)).unwrap();
        let err = store
            .apply(d(DirectiveKind::ClassExclude, "B", Payload::None, 3))
            .unwrap_err();
        assert!(matches!(err, ConflictError::OutOfOrder { order: 3, last: 3, .. }));
        assert!(!store.is_excluded(DirectiveKind::ClassExclude, &qn("B")));
    }

    #[test]
    fn test_template_rule_matches_instantiation() {
        let mut store = PolicyStore::new();
        store
            .apply(d(
                DirectiveKind::FunctionExclude,
                "NCollection_DataMap<TheKeyType, TheItemType, Hasher>::Seek",
                Payload::None,
                0,
            ))
            .unwrap();
        assert!(store.is_excluded(
            DirectiveKind::FunctionExclude,
            &qn("NCollection_DataMap<int,string,Hash>::Seek")
        ));
        assert!(!store.is_excluded(
            DirectiveKind::FunctionExclude,
            &qn("NCollection_DataMap<int,string,Hash>::Find")
        ));
    }

    #[test]
    fn test_signature_rules() {
        let mut store = PolicyStore::new();
        store
            .apply(d(DirectiveKind::FunctionExclude, "gp_Pnt::SetCoord(int,double)", Payload::None, 0))
            .unwrap();
        assert!(store.is_excluded(DirectiveKind::FunctionExclude, &qn("gp_Pnt::SetCoord(int, double)")));
        assert!(!store.is_excluded(
            DirectiveKind::FunctionExclude,
            &qn("gp_Pnt::SetCoord(double,double,double)")
        ));

        store
            .apply(d(DirectiveKind::FunctionExclude, "gp_Vec::Dot", Payload::None, 1))
            .unwrap();
        assert!(store.is_excluded(DirectiveKind::FunctionExclude, &qn("gp_Vec::Dot(gp_Vec)")));
    }

    #[test]
    fn test_glob_patterns() {
        let mut store = PolicyStore::new();
        store
            .apply(d(DirectiveKind::FunctionExclude, "Standard_*::DumpJson", Payload::None, 0))
            .unwrap();
        assert!(store.is_excluded(DirectiveKind::FunctionExclude, &qn("Standard_Transient::DumpJson")));
        assert!(!store.is_excluded(DirectiveKind::FunctionExclude, &qn("gp_Pnt::DumpJson")));
        assert_eq!(store.directives_of(DirectiveKind::FunctionExclude).len(), 1);
    }

    #[test]
    fn test_exact_and_pattern_compete_by_order() {
        let mut store = PolicyStore::new();
        store
            .apply(d(DirectiveKind::PyNameOverride, "Geom_*", Payload::PythonName("glob".into()), 0))
            .unwrap();
        store
            .apply(d(DirectiveKind::PyNameOverride, "Geom_Curve", Payload::PythonName("exact".into()), 1))
            .unwrap();
        store
            .apply(d(DirectiveKind::PyNameOverride, "Geom_*", Payload::PythonName("glob2".into()), 2))
            .unwrap();
        let winner = store.query(DirectiveKind::PyNameOverride, &qn("Geom_Curve")).unwrap();
        assert_eq!(winner.payload, Payload::PythonName("glob2".into()));
        assert_eq!(store.overridden().len(), 1);
    }

    #[test]
    fn test_platform_qualified() {
        let mut store = PolicyStore::for_platform("linux");
        let mut win = d(DirectiveKind::ClassExclude, "OSD_Process", Payload::None, 0);
        win.platform = Some("win32".into());
        store.apply(win).unwrap();
        let mut lin = d(DirectiveKind::ClassExclude, "OSD_Thread", Payload::None, 1);
        lin.platform = Some("linux".into());
        store.apply(lin).unwrap();
        assert!(!store.is_excluded(DirectiveKind::ClassExclude, &qn("OSD_Process")));
        assert!(store.is_excluded(DirectiveKind::ClassExclude, &qn("OSD_Thread")));
        assert_eq!(store.inert().len(), 1);
    }

    #[test]
    fn test_literal_target_matches_static_variant() {
        let mut store = PolicyStore::new();
        store
            .apply(d(DirectiveKind::FunctionExclude, "BRepMesh_GeomTool::IntLinLin_", Payload::None, 0))
            .unwrap();
        let method = qn("BRepMesh_GeomTool::IntLinLin(gp_XY,gp_XY)");
        assert!(!store.is_excluded(DirectiveKind::FunctionExclude, &method));
        assert!(store.is_excluded(DirectiveKind::FunctionExclude, &method.static_variant()));
    }

    #[test]
    fn test_directives_of_and_affecting() {
        let mut store = PolicyStore::new();
        store.apply(d(DirectiveKind::Immutable, "gp_Pnt", Payload::None, 0)).unwrap();
        store.apply(d(DirectiveKind::Immutable, "gp_Vec", Payload::None, 1)).unwrap();
        store.apply(d(DirectiveKind::NoDelete, "gp_Pnt", Payload::None, 2)).unwrap();
        store
            .apply(d(DirectiveKind::PyNameOverride, "gp_Pnt", Payload::PythonName("a".into()), 3))
            .unwrap();
        store
            .apply(d(DirectiveKind::PyNameOverride, "gp_Pnt", Payload::PythonName("b".into()), 4))
            .unwrap();
        assert_eq!(store.directives_of(DirectiveKind::Immutable).len(), 2);
        let orders: Vec<usize> = store.affecting(&qn("gp_Pnt")).iter().map(|d| d.source_order).collect();
        assert_eq!(orders, vec![0, 2, 3, 4]);
    }

    #[test]
    fn test_text_targets() {
        let mut store = PolicyStore::new();
        store
            .apply(d(DirectiveKind::IncludeDir, "/opt/occt/include", Payload::None, 0))
            .unwrap();
        assert_eq!(store.query_all_str(DirectiveKind::IncludeDir, "/opt/occt/include").len(), 1);
        assert_eq!(store.directives_of(DirectiveKind::IncludeDir).len(), 1);
    }
}
