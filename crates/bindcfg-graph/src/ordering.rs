//! # Generation Ordering
//!
//! Total order over modules for code generation.
//!
//! A module must be generated after every module it requires through an
//! unguarded edge. Among modules that are ready, explicit `+sort` priorities
//! come first (lower first), then the rest; ties break by case-insensitive
//! name. A module required by a prioritized module inherits that priority so
//! it is pulled forward with it.
//!
//! ## Conflicts
//!
//! `A` with priority `p` requiring `B` with priority `q > p`, directly or
//! transitively, is an [`ResolveError::OrderingConflict`]; the dependency
//! wins. If a cycle of unguarded edges blocks progress, the member of that
//! cycle mentioned earliest in the ruleset is emitted first, unmentioned
//! members last by name. Only cycles that wait on nothing else are broken
//! this way, so edges off every cycle keep their order.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::deps::DependencyGraph;
use crate::error::ResolveError;
use crate::guard::GuardGraph;

/// Default priority of a symbol no intra-module rule matches.
pub const DEFAULT_SYMBOL_PRIORITY: i64 = 10_000;

/// Inputs to module ordering.
#[derive(Debug, Clone, Copy)]
pub struct OrderingResolver<'a> {
    deps: &'a DependencyGraph,
    guards: &'a GuardGraph,
    priorities: &'a BTreeMap<String, i64>,
    first_mention: &'a BTreeMap<String, usize>,
}

/// The computed order with everything noticed on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleOrder {
    /// Every module exactly once.
    pub order: Vec<String>,
    /// Priority contradictions, in discovery order.
    pub conflicts: Vec<ResolveError>,
    /// Modules emitted before all their requirements because of a cycle.
    pub forced: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ReadyKey {
    unprioritized: bool,
    priority: i64,
    folded: String,
    name: String,
}

impl<'a> OrderingResolver<'a> {
    /// Create a resolver. `first_mention` maps modules to the source order
    /// of the first directive naming them.
    pub fn new(
        deps: &'a DependencyGraph,
        guards: &'a GuardGraph,
        priorities: &'a BTreeMap<String, i64>,
        first_mention: &'a BTreeMap<String, usize>,
    ) -> Self {
        Self {
            deps,
            guards,
            priorities,
            first_mention,
        }
    }

    fn hard_dependencies(&self, module: &str) -> Vec<&'a str> {
        let deps: &'a DependencyGraph = self.deps;
        deps.dependencies(module)
            .filter(|dep| !self.guards.is_guarded(module, dep))
            .collect()
    }

    /// Effective priorities and the conflicts found while propagating them.
    fn propagate(&self) -> (BTreeMap<String, i64>, Vec<ResolveError>) {
        let mut effective: BTreeMap<String, i64> = self
            .priorities
            .iter()
            .filter(|(m, _)| self.deps.contains(m))
            .map(|(m, p)| (m.clone(), *p))
            .collect();
        let mut conflicts = Vec::new();

        for (module, &priority) in self.priorities {
            if !self.deps.contains(module) {
                continue;
            }
            let mut seen: BTreeSet<&str> = BTreeSet::new();
            let mut stack: Vec<&str> = self.hard_dependencies(module);
            while let Some(dep) = stack.pop() {
                if dep == module.as_str() || !seen.insert(dep) {
                    continue;
                }
                if let Some(&own) = self.priorities.get(dep) {
                    if priority < own {
                        conflicts.push(ResolveError::OrderingConflict {
                            dependent: module.clone(),
                            dependency: dep.to_string(),
                            dependent_priority: priority,
                            dependency_priority: own,
                        });
                    }
                }
                let slot = effective.entry(dep.to_string()).or_insert(priority);
                *slot = (*slot).min(priority);
                stack.extend(self.hard_dependencies(dep));
            }
        }
        (effective, conflicts)
    }

    /// Module to emit when every remaining module is blocked: the earliest
    /// mentioned member of a cycle that waits on nothing outside itself.
    /// Modules that merely depend on a cycle are never picked.
    fn cycle_entry(&self, emitted: &BTreeSet<String>) -> Option<String> {
        let residual = self.deps.filter_edges(|from, to| {
            !emitted.contains(from) && !emitted.contains(to) && !self.guards.is_guarded(from, to)
        });
        residual
            .strongly_connected_components()
            .into_iter()
            .filter(|members| members.len() > 1)
            .filter(|members| {
                members.iter().all(|m| {
                    residual
                        .dependencies(m)
                        .all(|dep| members.iter().any(|other| other.as_str() == dep))
                })
            })
            .flatten()
            .min_by_key(|m| (self.first_mention.get(m).copied().unwrap_or(usize::MAX), m.clone()))
    }

    /// Compute the order.
    pub fn resolve(&self) -> ModuleOrder {
        let (effective, conflicts) = self.propagate();
        let key = |m: &str| ReadyKey {
            unprioritized: !effective.contains_key(m),
            priority: effective.get(m).copied().unwrap_or(0),
            folded: m.to_lowercase(),
            name: m.to_string(),
        };

        let mut pending: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for module in self.deps.modules() {
            let hard = self.hard_dependencies(module);
            pending.insert(module, hard.len());
            for dep in hard {
                dependents.entry(dep).or_default().push(module);
            }
        }

        let mut ready: BTreeSet<ReadyKey> = pending
            .iter()
            .filter(|(_, n)| **n == 0)
            .map(|(m, _)| key(*m))
            .collect();
        let mut emitted: BTreeSet<String> = BTreeSet::new();
        let mut order = Vec::with_capacity(pending.len());
        let mut forced = Vec::new();

        while order.len() < pending.len() {
            let next = match ready.pop_first() {
                Some(k) => k.name,
                None => {
                    // Cycle: every remaining module waits on another.
                    let Some(stuck) = self.cycle_entry(&emitted) else {
                        break;
                    };
                    debug!(module = %stuck, "breaking unguarded cycle by declaration order");
                    forced.push(stuck.clone());
                    stuck
                }
            };
            if !emitted.insert(next.clone()) {
                continue;
            }
            for &dependent in dependents.get(next.as_str()).into_iter().flatten() {
                if let Some(count) = pending.get_mut(dependent) {
                    *count = count.saturating_sub(1);
                    if *count == 0 && !emitted.contains(dependent) {
                        ready.insert(key(dependent));
                    }
                }
            }
            order.push(next);
        }

        info!(
            modules = order.len(),
            conflicts = conflicts.len(),
            forced = forced.len(),
            "generation order resolved"
        );
        ModuleOrder {
            order,
            conflicts,
            forced,
        }
    }
}

/// One `+sort Module: pattern=N` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRule {
    /// Substring matched against symbol spellings.
    pub pattern: String,
    pub priority: i64,
}

/// Order symbols inside one module. The last rule whose pattern occurs in a
/// symbol's spelling sets its priority; unmatched symbols get
/// `default_priority`. Equal priorities keep their input order.
pub fn order_symbols<S: AsRef<str>>(
    rules: &[SymbolRule],
    symbols: &[S],
    default_priority: i64,
) -> Vec<String> {
    let mut keyed: Vec<(i64, usize, &str)> = symbols
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let s = s.as_ref();
            let priority = rules
                .iter()
                .rev()
                .find(|r| s.contains(r.pattern.as_str()))
                .map(|r| r.priority)
                .unwrap_or(default_priority);
            (priority, i, s)
        })
        .collect();
    keyed.sort();
    keyed.into_iter().map(|(_, _, s)| s.to_string()).collect()
}
