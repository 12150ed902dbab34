//! # bindcfg-policy — Policy Resolution Pipeline
//!
//! Ties the parser, store and resolvers together. An [`Engine`] takes rule
//! sources plus [`GenerationInputs`] and produces a [`ResolvedPolicy`]: an
//! immutable, thread-safe value the binding generator queries per module
//! and per symbol.
//!
//! ```text
//! rules ──▶ Ruleset ──▶ PolicyStore ──▶ cycles + ordering ──▶ ResolvedPolicy
//!                                  ▲
//!                  GenerationInputs (modules, include facts, symbols)
//! ```
//!
//! ## Crate Policy
//!
//! - No global state. Every consumer receives the policy value explicitly.
//! - Resolution problems are [`bindcfg_core::Diagnostics`]; only a strict
//!   configuration turns them into a failed resolution.

pub mod config;
pub mod engine;
pub mod error;
pub mod inputs;
pub mod policy;
pub mod validate;

pub use config::{host_platform, EngineConfig};
pub use engine::Engine;
pub use error::{PolicyError, PolicyResult};
pub use inputs::GenerationInputs;
pub use policy::{DirectiveStatus, ExplainedDirective, Explanation, ResolvedPolicy, ANY_PLATFORM};
pub use validate::{unknown_targets, SymbolIndex};
