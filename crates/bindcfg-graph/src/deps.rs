//! # Module Dependency Graph
//!
//! Directed "includes" relation among modules as reported by the generation
//! pipeline: an edge `A -> B` means the header generated for `A` includes the
//! header generated for `B`, so `B` has to be generated first unless the
//! reference is guarded.
//!
//! Self edges are dropped on insertion. Nodes iterate in name order, which
//! makes every traversal below deterministic.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// One dependency fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleEdge {
    /// Including module.
    pub from: String,
    /// Included module.
    pub to: String,
}

impl ModuleEdge {
    /// Create an edge.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Modules and their non-guard include edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    requires: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Build from a module list and edges. Edge endpoints are added as
    /// modules.
    pub fn new(
        modules: impl IntoIterator<Item = String>,
        edges: impl IntoIterator<Item = ModuleEdge>,
    ) -> Self {
        let mut graph = Self::default();
        for module in modules {
            graph.add_module(module);
        }
        for edge in edges {
            graph.add_edge(edge);
        }
        graph
    }

    /// Add a module without edges.
    pub fn add_module(&mut self, module: impl Into<String>) {
        self.requires.entry(module.into()).or_default();
    }

    /// Add an edge. Self edges are ignored.
    pub fn add_edge(&mut self, edge: ModuleEdge) {
        self.add_module(edge.to.clone());
        let deps = self.requires.entry(edge.from.clone()).or_default();
        if edge.from != edge.to {
            deps.insert(edge.to);
        }
    }

    /// Drop one edge. Returns whether it existed.
    pub fn remove_edge(&mut self, from: &str, to: &str) -> bool {
        self.requires
            .get_mut(from)
            .map(|deps| deps.remove(to))
            .unwrap_or(false)
    }

    /// Drop a module and every edge touching it.
    pub fn remove_module(&mut self, module: &str) {
        self.requires.remove(module);
        for deps in self.requires.values_mut() {
            deps.remove(module);
        }
    }

    /// Whether the module is known.
    pub fn contains(&self, module: &str) -> bool {
        self.requires.contains_key(module)
    }

    /// Whether `from -> to` exists.
    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.requires
            .get(from)
            .is_some_and(|deps| deps.contains(to))
    }

    /// Modules in name order.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.requires.keys().map(String::as_str)
    }

    /// Direct dependencies of `module`, in name order.
    pub fn dependencies<'a>(&'a self, module: &str) -> impl Iterator<Item = &'a str> {
        self.requires
            .get(module)
            .into_iter()
            .flat_map(|deps| deps.iter().map(String::as_str))
    }

    /// All edges, ordered by `(from, to)`.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.requires
            .iter()
            .flat_map(|(from, deps)| deps.iter().map(move |to| (from.as_str(), to.as_str())))
    }

    /// Number of modules.
    pub fn module_count(&self) -> usize {
        self.requires.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.requires.values().map(BTreeSet::len).sum()
    }

    /// Copy of the graph keeping only edges for which `keep` holds.
    pub fn filter_edges(&self, mut keep: impl FnMut(&str, &str) -> bool) -> Self {
        let requires = self
            .requires
            .iter()
            .map(|(from, deps)| {
                let kept = deps.iter().filter(|to| keep(from, to)).cloned().collect();
                (from.clone(), kept)
            })
            .collect();
        Self { requires }
    }

    /// Strongly connected components (Kosaraju, iterative). Each component
    /// is sorted by name; components are sorted by their first member.
    pub fn strongly_connected_components(&self) -> Vec<Vec<String>> {
        let names: Vec<&str> = self.modules().collect();
        let index: BTreeMap<&str, usize> = names.iter().enumerate().map(|(i, n)| (*n, i)).collect();
        let forward: Vec<Vec<usize>> = names
            .iter()
            .map(|n| self.dependencies(n).filter_map(|d| index.get(d).copied()).collect())
            .collect();
        let mut backward: Vec<Vec<usize>> = vec![Vec::new(); names.len()];
        for (from, deps) in forward.iter().enumerate() {
            for &to in deps {
                backward[to].push(from);
            }
        }

        // First pass: finish order on the forward graph.
        let mut visited = vec![false; names.len()];
        let mut finished = Vec::with_capacity(names.len());
        for start in 0..names.len() {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            let mut stack = vec![(start, 0usize)];
            while let Some(top) = stack.last_mut() {
                let (node, next) = *top;
                if let Some(&succ) = forward[node].get(next) {
                    top.1 += 1;
                    if !visited[succ] {
                        visited[succ] = true;
                        stack.push((succ, 0));
                    }
                } else {
                    finished.push(node);
                    stack.pop();
                }
            }
        }

        // Second pass: collect components on the transposed graph.
        let mut component = vec![usize::MAX; names.len()];
        let mut components: Vec<Vec<String>> = Vec::new();
        for &root in finished.iter().rev() {
            if component[root] != usize::MAX {
                continue;
            }
            let id = components.len();
            component[root] = id;
            let mut members = Vec::new();
            let mut stack = vec![root];
            while let Some(node) = stack.pop() {
                members.push(names[node].to_string());
                for &pred in &backward[node] {
                    if component[pred] == usize::MAX {
                        component[pred] = id;
                        stack.push(pred);
                    }
                }
            }
            members.sort();
            components.push(members);
        }
        components.sort();
        components
    }

    /// Shortest path `from ..= to` using only modules in `within`, by BFS in
    /// name order.
    pub fn path_within(&self, from: &str, to: &str, within: &BTreeSet<&str>) -> Option<Vec<String>> {
        let mut parent: BTreeMap<&str, &str> = BTreeMap::new();
        let mut queue = std::collections::VecDeque::from([from]);
        let mut seen: BTreeSet<&str> = BTreeSet::from([from]);
        while let Some(node) = queue.pop_front() {
            if node == to {
                let mut path = vec![to.to_string()];
                let mut cur = to;
                while let Some(&p) = parent.get(cur) {
                    path.push(p.to_string());
                    cur = p;
                }
                path.reverse();
                return Some(path);
            }
            for next in self.dependencies(node) {
                if within.contains(next) && seen.insert(next) {
                    parent.insert(next, node);
                    queue.push_back(next);
                }
            }
        }
        None
    }
}
