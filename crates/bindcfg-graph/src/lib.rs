//! # bindcfg-graph — Guard and Ordering Resolvers
//!
//! Works on the module level. The generation pipeline reports which module
//! headers include which ([`DependencyGraph`]); the ruleset declares which of
//! those references may be deferred ([`GuardGraph`]).
//!
//! - [`analyze_cycles`] checks that every dependency cycle is broken by
//!   guards and decides where each guarded reference goes.
//! - [`OrderingResolver`] produces the module generation order from the
//!   unguarded edges and explicit priorities.
//! - [`order_symbols`] orders symbols inside one module.
//!
//! Both resolvers report problems as [`ResolveError`] values instead of
//! failing; the caller decides whether they are fatal.

pub mod cycles;
pub mod deps;
pub mod error;
pub mod guard;
pub mod ordering;

pub use cycles::{analyze_cycles, GuardAnalysis, GuardCoverage, GuardPlacement, Placement};
pub use deps::{DependencyGraph, ModuleEdge};
pub use error::ResolveError;
pub use guard::{GuardEdge, GuardGraph, GuardKind};
pub use ordering::{order_symbols, ModuleOrder, OrderingResolver, SymbolRule, DEFAULT_SYMBOL_PRIORITY};
