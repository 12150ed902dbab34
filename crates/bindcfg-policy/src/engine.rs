//! # Resolution Engine
//!
//! Runs the resolution pipeline once, front to back:
//!
//! 1. parse rule sources into a [`Ruleset`];
//! 2. apply every directive to a [`PolicyStore`] in source order;
//! 3. check rule targets against the introspected symbol table;
//! 4. build the module dependency graph, drop excluded modules and
//!    `-import` edges;
//! 5. check guard coverage of every dependency cycle;
//! 6. compute the generation order;
//! 7. freeze everything into a [`ResolvedPolicy`].
//!
//! ## Strictness
//!
//! Unbroken cycles, ordering conflicts, store conflicts and malformed lines
//! are errors under a strict configuration and warnings otherwise. A strict
//! run with any error returns [`PolicyError::Diagnostics`] and no policy.
//! `UnknownSymbol` is always a warning.

use std::collections::BTreeMap;
use std::path::Path;

use bindcfg_core::{
    module_of, normalize, Diagnostic, DiagnosticKind, Diagnostics, DirectiveKind, Severity,
};
use bindcfg_graph::{
    analyze_cycles, DependencyGraph, GuardGraph, OrderingResolver, SymbolRule,
};
use bindcfg_parser::{ParseError, ParseOutcome, Ruleset, RulesetParser};
use bindcfg_store::PolicyStore;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{PolicyError, PolicyResult};
use crate::inputs::GenerationInputs;
use crate::policy::{PolicyParts, ResolvedPolicy};
use crate::validate::{unknown_targets, SymbolIndex};

/// Builds [`ResolvedPolicy`] values under one configuration.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    /// Create an engine.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse one rule source and resolve it.
    ///
    /// # Errors
    ///
    /// See [`Engine::resolve`].
    pub fn resolve_str(
        &self,
        name: &str,
        text: &str,
        inputs: &GenerationInputs,
    ) -> PolicyResult<ResolvedPolicy> {
        let mut parser = RulesetParser::new(self.config.parse_mode());
        self.strict_parse(parser.add_source(name, text))?;
        self.resolve(parser.finish(), inputs)
    }

    /// Parse rule files, in the given order, and resolve them as one
    /// ruleset.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Parse`] for unreadable files; otherwise see
    /// [`Engine::resolve`].
    pub fn resolve_files<P: AsRef<Path>>(
        &self,
        paths: &[P],
        inputs: &GenerationInputs,
    ) -> PolicyResult<ResolvedPolicy> {
        let mut parser = RulesetParser::new(self.config.parse_mode());
        for path in paths {
            self.strict_parse(parser.add_file(path.as_ref()))?;
        }
        self.resolve(parser.finish(), inputs)
    }

    fn strict_parse(&self, result: Result<(), ParseError>) -> PolicyResult<()> {
        match result {
            Ok(()) => Ok(()),
            Err(err @ ParseError::MalformedDirective { .. }) => {
                Err(PolicyError::Diagnostics(Diagnostics::from(vec![err.to_diagnostic()])))
            }
            Err(err) => Err(PolicyError::Parse(err)),
        }
    }

    fn fatal_severity(&self) -> Severity {
        if self.config.strict {
            Severity::Error
        } else {
            Severity::Warning
        }
    }

    /// Resolve a parsed ruleset against the generation inputs.
    ///
    /// # Errors
    ///
    /// Under a strict configuration, returns [`PolicyError::Diagnostics`]
    /// with every diagnostic if any of them is an error. Returns
    /// [`PolicyError::Canonicalization`] if the fingerprint cannot be
    /// computed.
    pub fn resolve(
        &self,
        outcome: ParseOutcome,
        inputs: &GenerationInputs,
    ) -> PolicyResult<ResolvedPolicy> {
        let ParseOutcome { ruleset, errors } = outcome;
        let severity = self.fatal_severity();
        let mut diagnostics = Diagnostics::new();
        for err in &errors {
            let mut diag = err.to_diagnostic();
            diag.severity = severity;
            diagnostics.push(diag);
        }

        let store = self.build_store(&ruleset, &mut diagnostics, severity);

        if self.config.validate_symbols && !inputs.symbols.is_empty() {
            let index = SymbolIndex::new(&inputs.symbols);
            let unknown = unknown_targets(ruleset.directives(), &index);
            debug!(symbols = index.len(), unknown = unknown.len(), "rule targets validated");
            diagnostics.extend(unknown);
        }

        let deps = dependency_graph(&store, inputs);
        let mut guards = GuardGraph::from_store(&store);
        guards.retain(|edge| edge.from != edge.to && deps.contains(&edge.from) && deps.contains(&edge.to));

        let analysis = analyze_cycles(&deps, &guards, self.config.guard_coverage);
        diagnostics.extend(analysis.unbroken.iter().map(|e| e.to_diagnostic(severity)));
        diagnostics.extend(analysis.warnings);

        let priorities: BTreeMap<String, i64> = store
            .directives_of(DirectiveKind::SortPriority)
            .into_iter()
            .filter_map(|d| Some((d.target.trim().to_string(), d.payload.priority()?)))
            .collect();
        let first_mention = first_mentions(&ruleset);
        let order = OrderingResolver::new(&deps, &guards, &priorities, &first_mention).resolve();
        diagnostics.extend(order.conflicts.iter().map(|e| e.to_diagnostic(severity)));
        if !order.forced.is_empty() {
            debug!(forced = ?order.forced, "cycle broken by declaration order");
        }

        if self.config.strict && diagnostics.has_errors() {
            info!(diagnostics = diagnostics.len(), "strict resolution failed");
            return Err(PolicyError::Diagnostics(diagnostics));
        }
        for diag in diagnostics.with_severity(Severity::Warning) {
            warn!("{diag}");
        }

        let symbol_rules = symbol_rules(&store);
        info!(
            directives = ruleset.directive_count(),
            active = store.len(),
            modules = order.order.len(),
            guarded_edges = analysis.placements.len(),
            diagnostics = diagnostics.len(),
            "policy resolved"
        );
        ResolvedPolicy::build(PolicyParts {
            config: self.config.clone(),
            ruleset,
            store,
            order: order.order,
            guards,
            placements: analysis.placements,
            symbol_rules,
            diagnostics,
        })
    }

    fn build_store(
        &self,
        ruleset: &Ruleset,
        diagnostics: &mut Diagnostics,
        severity: Severity,
    ) -> PolicyStore {
        let mut store = PolicyStore::for_platform(self.config.platform.clone());
        for directive in ruleset.directives() {
            if directive.active && !directive.applies_to(Some(&self.config.platform)) {
                diagnostics.push(
                    Diagnostic::info(
                        DiagnosticKind::PlatformSkipped,
                        format!(
                            "`{}` applies to {} only; platform is {}",
                            directive.to_line(),
                            directive.platform.as_deref().unwrap_or_default(),
                            self.config.platform
                        ),
                    )
                    .at(directive.location.clone()),
                );
            }
            if let Err(err) = store.apply(directive.clone()) {
                let mut diag = err.to_diagnostic();
                diag.severity = severity;
                diagnostics.push(diag);
            }
        }
        info!(
            active = store.len(),
            inert = store.inert().len(),
            overridden = store.overridden().len(),
            "policy store built"
        );
        store
    }
}

/// Modules from the inputs and `+sort` rules, include facts minus `-import`
/// edges, with excluded modules removed.
fn dependency_graph(store: &PolicyStore, inputs: &GenerationInputs) -> DependencyGraph {
    let mut deps = DependencyGraph::new(inputs.modules.iter().cloned(), inputs.dependencies.iter().cloned());
    for directive in store.directives_of(DirectiveKind::SortPriority) {
        deps.add_module(directive.target.trim());
    }
    for directive in store.directives_of(DirectiveKind::ImportExclude) {
        if let Some(to) = directive.payload.module() {
            if deps.remove_edge(directive.target.trim(), to) {
                debug!(from = %directive.target, %to, "dependency edge dropped by -import");
            }
        }
    }
    let excluded: Vec<String> = deps
        .modules()
        .filter(|m| {
            normalize(m)
                .map(|name| store.is_excluded(DirectiveKind::ModuleExclude, &name))
                .unwrap_or(false)
        })
        .map(str::to_string)
        .collect();
    for module in &excluded {
        deps.remove_module(module);
    }
    if !excluded.is_empty() {
        debug!(excluded = excluded.len(), "excluded modules removed from dependency graph");
    }
    deps
}

/// Source order of the first active directive mentioning each module,
/// through its target or a module payload.
fn first_mentions(ruleset: &Ruleset) -> BTreeMap<String, usize> {
    let mut out = BTreeMap::new();
    for directive in ruleset.active_directives() {
        let target = module_of(&directive.target);
        if !target.is_empty() {
            out.entry(target.to_string()).or_insert(directive.source_order);
        }
        if let Some(module) = directive.payload.module() {
            out.entry(module.to_string()).or_insert(directive.source_order);
        }
    }
    out
}

/// Intra-module `+sort M: pattern=N` rules, grouped by module in source
/// order.
fn symbol_rules(store: &PolicyStore) -> BTreeMap<String, Vec<SymbolRule>> {
    let mut out: BTreeMap<String, Vec<SymbolRule>> = BTreeMap::new();
    for directive in store.directives_of(DirectiveKind::SymbolPriority) {
        if let bindcfg_core::Payload::PatternPriority { pattern, priority } = &directive.payload {
            out.entry(directive.target.trim().to_string())
                .or_default()
                .push(SymbolRule {
                    pattern: pattern.clone(),
                    priority: *priority,
                });
        }
    }
    out
}
