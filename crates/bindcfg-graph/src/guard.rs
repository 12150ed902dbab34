//! # Guard Graph
//!
//! Guards mark a cross-module reference as safe to break a cycle with:
//!
//! - `+iguard M: N`: module `M` imports `N` through a forward declaration
//!   (declaration-level placement).
//! - `+cguard F-->N`: function `F` defers its reference to `N` into the
//!   function body (call-site placement). The guarded edge starts at the
//!   module owning `F`.
//!
//! Several guards may sit on one edge; the graph keeps all of them.

use std::collections::BTreeMap;

use bindcfg_core::{module_of, Directive, DirectiveKind, Location};
use bindcfg_store::PolicyStore;
use serde::{Deserialize, Serialize};

/// Which guard directive produced an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardKind {
    /// `+iguard`
    Import,
    /// `+cguard`
    Call,
}

/// A guarded module reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardEdge {
    /// Module holding the reference.
    pub from: String,
    /// Referenced module.
    pub to: String,
    /// Guard kind.
    pub kind: GuardKind,
    /// The module or type for import guards, the function for call guards.
    pub anchor: String,
    /// Where the guard was declared.
    pub location: Location,
}

impl GuardEdge {
    /// Build the edge for an active guard directive; `None` for any other
    /// kind.
    pub fn from_directive(directive: &Directive) -> Option<Self> {
        let kind = match directive.kind {
            DirectiveKind::ImportGuard => GuardKind::Import,
            DirectiveKind::CallGuard => GuardKind::Call,
            _ => return None,
        };
        let to = directive.payload.module()?.to_string();
        Some(Self {
            from: module_of(&directive.target).to_string(),
            to,
            kind,
            anchor: directive.target.clone(),
            location: directive.location.clone(),
        })
    }
}

/// All guard edges, grouped by `(from, to)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardGraph {
    edges: BTreeMap<(String, String), Vec<GuardEdge>>,
}

impl GuardGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every active guard directive held by `store`.
    pub fn from_store(store: &PolicyStore) -> Self {
        let mut graph = Self::new();
        for kind in [DirectiveKind::ImportGuard, DirectiveKind::CallGuard] {
            for directive in store.directives_of(kind) {
                if let Some(edge) = GuardEdge::from_directive(directive) {
                    graph.add(edge);
                }
            }
        }
        graph
    }

    /// Add one guard.
    pub fn add(&mut self, edge: GuardEdge) {
        self.edges
            .entry((edge.from.clone(), edge.to.clone()))
            .or_default()
            .push(edge);
    }

    /// Keep only the guards for which `keep` holds.
    pub fn retain(&mut self, mut keep: impl FnMut(&GuardEdge) -> bool) {
        for guards in self.edges.values_mut() {
            guards.retain(&mut keep);
        }
        self.edges.retain(|_, guards| !guards.is_empty());
    }

    /// Guards on the edge `from -> to`.
    pub fn guards_on(&self, from: &str, to: &str) -> &[GuardEdge] {
        self.edges
            .get(&(from.to_string(), to.to_string()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether any guard covers `from -> to`.
    pub fn is_guarded(&self, from: &str, to: &str) -> bool {
        !self.guards_on(from, to).is_empty()
    }

    /// Guards whose reference starts in `module`, in edge order.
    pub fn guards_for(&self, module: &str) -> Vec<&GuardEdge> {
        self.edges
            .iter()
            .filter(|((from, _), _)| from == module)
            .flat_map(|(_, guards)| guards.iter())
            .collect()
    }

    /// Guarded `(from, to)` pairs with their guards.
    pub fn iter(&self) -> impl Iterator<Item = (&(String, String), &Vec<GuardEdge>)> {
        self.edges.iter()
    }

    /// Number of guarded edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// True when no guard exists.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
