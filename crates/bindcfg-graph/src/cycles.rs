//! # Cycle Coverage and Guard Placement
//!
//! Finds dependency cycles among modules and checks that guards break them.
//!
//! ## Coverage Modes
//!
//! - [`GuardCoverage::EveryEdge`]: every dependency edge lying on a cycle
//!   must carry a guard. Each unguarded cyclic edge is one
//!   [`ResolveError::UnbrokenCycle`], so removing a single guard from a
//!   fully guarded cycle yields exactly one error naming that edge.
//! - [`GuardCoverage::AnyEdge`]: one guard per cycle suffices. Cycles are
//!   searched in the residual graph (guarded edges removed) by DFS; each
//!   back edge found is one error.
//!
//! ## Placement
//!
//! An edge guarded by `+iguard` is placed at declaration level, an edge
//! guarded only by `+cguard` at call-site level. Both on one edge is allowed;
//! declaration level is used and a `RedundantGuard` warning is raised.

use std::collections::{BTreeMap, BTreeSet};

use bindcfg_core::{Diagnostic, DiagnosticKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::deps::DependencyGraph;
use crate::error::ResolveError;
use crate::guard::{GuardGraph, GuardKind};

/// How many guards a cycle needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardCoverage {
    /// Every cyclic edge needs a guard.
    #[default]
    EveryEdge,
    /// One guarded edge breaks a cycle.
    AnyEdge,
}

/// Where the generator puts a guarded reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Forward declaration instead of an include.
    Declaration,
    /// Reference deferred into a function body.
    CallSite,
}

/// Placement decided for one guarded edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardPlacement {
    pub from: String,
    pub to: String,
    pub placement: Placement,
    /// Anchors of the guards on the edge, in declaration order.
    pub anchors: Vec<String>,
    /// Whether the edge lies on a dependency cycle.
    pub on_cycle: bool,
    /// Whether both guard kinds cover the edge.
    pub redundant: bool,
}

/// Result of cycle analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardAnalysis {
    /// Unguarded cycles, one per uncovered edge or back edge.
    pub unbroken: Vec<ResolveError>,
    /// One entry per guarded edge, ordered by `(from, to)`.
    pub placements: Vec<GuardPlacement>,
    /// `RedundantGuard` warnings.
    pub warnings: Vec<Diagnostic>,
}

/// Check guard coverage of every cycle in `deps`.
pub fn analyze_cycles(
    deps: &DependencyGraph,
    guards: &GuardGraph,
    coverage: GuardCoverage,
) -> GuardAnalysis {
    let components = deps.strongly_connected_components();
    let mut component_of: BTreeMap<&str, usize> = BTreeMap::new();
    for (id, members) in components.iter().enumerate() {
        for m in members {
            component_of.insert(m.as_str(), id);
        }
    }
    let on_cycle = |from: &str, to: &str| -> bool {
        deps.has_edge(from, to)
            && matches!(
                (component_of.get(from), component_of.get(to)),
                (Some(a), Some(b)) if a == b
            )
    };

    let unbroken = match coverage {
        GuardCoverage::EveryEdge => every_edge(deps, guards, &components, &on_cycle),
        GuardCoverage::AnyEdge => any_edge(deps, guards),
    };

    let mut placements = Vec::new();
    let mut warnings = Vec::new();
    for ((from, to), edges) in guards.iter() {
        let has_import = edges.iter().any(|e| e.kind == GuardKind::Import);
        let has_call = edges.iter().any(|e| e.kind == GuardKind::Call);
        let cyclic = on_cycle(from.as_str(), to.as_str());
        if !cyclic {
            debug!(%from, %to, "guard on edge outside any cycle");
        }
        if has_import && has_call {
            let location = edges.iter().map(|e| e.location.clone()).max();
            let mut warning = Diagnostic::warning(
                DiagnosticKind::RedundantGuard,
                format!("{from} -> {to} has both an import guard and a call guard; the import guard is used"),
            );
            if let Some(loc) = location {
                warning = warning.at(loc);
            }
            warnings.push(warning);
        }
        placements.push(GuardPlacement {
            from: from.clone(),
            to: to.clone(),
            placement: if has_import {
                Placement::Declaration
            } else {
                Placement::CallSite
            },
            anchors: edges.iter().map(|e| e.anchor.clone()).collect(),
            on_cycle: cyclic,
            redundant: has_import && has_call,
        });
    }

    info!(
        components = components.iter().filter(|c| c.len() > 1).count(),
        unbroken = unbroken.len(),
        guarded_edges = placements.len(),
        "cycle analysis complete"
    );
    GuardAnalysis {
        unbroken,
        placements,
        warnings,
    }
}

fn every_edge(
    deps: &DependencyGraph,
    guards: &GuardGraph,
    components: &[Vec<String>],
    on_cycle: &dyn Fn(&str, &str) -> bool,
) -> Vec<ResolveError> {
    let mut out = Vec::new();
    for members in components.iter().filter(|c| c.len() > 1) {
        let within: BTreeSet<&str> = members.iter().map(String::as_str).collect();
        for &from in &within {
            for to in deps.dependencies(from) {
                if !on_cycle(from, to) || guards.is_guarded(from, to) {
                    continue;
                }
                // The edge closes a cycle through the path back from `to`.
                let mut cycle = vec![from.to_string()];
                cycle.extend(deps.path_within(to, from, &within).unwrap_or_default());
                out.push(ResolveError::UnbrokenCycle {
                    from: from.to_string(),
                    to: to.to_string(),
                    cycle,
                });
            }
        }
    }
    out
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Grey,
    Black,
}

fn any_edge(deps: &DependencyGraph, guards: &GuardGraph) -> Vec<ResolveError> {
    let residual = deps.filter_edges(|from, to| !guards.is_guarded(from, to));
    let mut color: BTreeMap<&str, Color> = residual.modules().map(|m| (m, Color::White)).collect();
    let mut out = Vec::new();

    let roots: Vec<&str> = residual.modules().collect();
    for root in roots {
        if color.get(root) != Some(&Color::White) {
            continue;
        }
        color.insert(root, Color::Grey);
        let mut stack: Vec<(&str, Vec<&str>)> = vec![(root, residual.dependencies(root).collect())];
        let mut path: Vec<&str> = vec![root];
        while let Some((node, pending)) = stack.last_mut() {
            let node = *node;
            if pending.is_empty() {
                color.insert(node, Color::Black);
                stack.pop();
                path.pop();
                continue;
            }
            let next = pending.remove(0);
            match color.get(next).copied().unwrap_or(Color::White) {
                Color::White => {
                    color.insert(next, Color::Grey);
                    path.push(next);
                    stack.push((next, residual.dependencies(next).collect()));
                }
                Color::Grey => {
                    let start = path.iter().position(|m| *m == next).unwrap_or(0);
                    let mut cycle = vec![node.to_string()];
                    cycle.extend(path[start..].iter().map(|m| m.to_string()));
                    out.push(ResolveError::UnbrokenCycle {
                        from: node.to_string(),
                        to: next.to_string(),
                        cycle,
                    });
                }
                Color::Black => {}
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::ModuleEdge;
    use crate::guard::GuardEdge;
    use bindcfg_core::Location;

    fn deps(edges: &[(&str, &str)]) -> DependencyGraph {
        DependencyGraph::new(Vec::new(), edges.iter().map(|(f, t)| ModuleEdge::new(*f, *t)))
    }

    fn guard(from: &str, to: &str, kind: GuardKind, line: usize) -> GuardEdge {
        GuardEdge {
            from: from.into(),
            to: to.into(),
            kind,
            anchor: from.into(),
            location: Location::new("g", line),
        }
    }

    fn guards(edges: &[(&str, &str)]) -> GuardGraph {
        let mut g = GuardGraph::new();
        for (i, (f, t)) in edges.iter().enumerate() {
            g.add(guard(f, t, GuardKind::Import, i + 1));
        }
        g
    }

    const TRIANGLE: &[(&str, &str)] = &[("A", "B"), ("B", "C"), ("C", "A")];

    #[test]
    fn test_fully_guarded_triangle() {
        let a = analyze_cycles(&deps(TRIANGLE), &guards(TRIANGLE), GuardCoverage::EveryEdge);
        assert!(a.unbroken.is_empty());
        assert_eq!(a.placements.len(), 3);
        assert!(a.placements.iter().all(|p| p.on_cycle));
    }

    #[test]
    fn test_missing_guard_names_edge() {
        let a = analyze_cycles(
            &deps(TRIANGLE),
            &guards(&[("A", "B"), ("B", "C")]),
            GuardCoverage::EveryEdge,
        );
        assert_eq!(
            a.unbroken,
            vec![ResolveError::UnbrokenCycle {
                from: "C".into(),
                to: "A".into(),
                cycle: vec!["C".into(), "A".into(), "B".into(), "C".into()],
            }]
        );
    }

    #[test]
    fn test_unguarded_triangle_reports_every_edge() {
        let a = analyze_cycles(&deps(TRIANGLE), &GuardGraph::new(), GuardCoverage::EveryEdge);
        assert_eq!(a.unbroken.len(), 3);
    }

    #[test]
    fn test_any_edge_single_guard_breaks_cycle() {
        let a = analyze_cycles(&deps(TRIANGLE), &guards(&[("C", "A")]), GuardCoverage::AnyEdge);
        assert!(a.unbroken.is_empty());

        let b = analyze_cycles(&deps(TRIANGLE), &GuardGraph::new(), GuardCoverage::AnyEdge);
        assert_eq!(b.unbroken.len(), 1);
        match &b.unbroken[0] {
            ResolveError::UnbrokenCycle { from, to, cycle } => {
                assert_eq!((from.as_str(), to.as_str()), ("C", "A"));
                assert_eq!(cycle, &vec!["C", "A", "B", "C"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_acyclic_graph_has_no_errors() {
        let a = analyze_cycles(
            &deps(&[("A", "B"), ("B", "C"), ("A", "C")]),
            &guards(&[("A", "B")]),
            GuardCoverage::EveryEdge,
        );
        assert!(a.unbroken.is_empty());
        assert_eq!(a.placements.len(), 1);
        assert!(!a.placements[0].on_cycle);
    }

    #[test]
    fn test_placement_kinds_and_redundancy() {
        let mut g = GuardGraph::new();
        g.add(guard("A", "B", GuardKind::Call, 1));
        g.add(guard("B", "A", GuardKind::Import, 2));
        g.add(guard("B", "A", GuardKind::Call, 3));
        let a = analyze_cycles(&deps(&[("A", "B"), ("B", "A")]), &g, GuardCoverage::EveryEdge);
        assert!(a.unbroken.is_empty());
        let ab = &a.placements[0];
        assert_eq!((ab.from.as_str(), ab.placement, ab.redundant), ("A", Placement::CallSite, false));
        let ba = &a.placements[1];
        assert_eq!((ba.from.as_str(), ba.placement, ba.redundant), ("B", Placement::Declaration, true));
        assert_eq!(a.warnings.len(), 1);
        assert_eq!(a.warnings[0].kind, DiagnosticKind::RedundantGuard);
        assert_eq!(a.warnings[0].location, Some(Location::new("g", 3)));
    }
}
