//! # bindcfg-core — Foundational Types for the Binding Policy Engine
//!
//! Every other `bindcfg-*` crate depends on this one; it depends on nothing
//! internal.
//!
//! ## Key Design Principles
//!
//! 1. **One name model.** Rule targets and introspected symbols both pass
//!    through [`normalize`], so the store index, the matcher and the symbol
//!    validator agree on what a name is. Template arguments become a
//!    wildcard, a trailing `_` makes a literal.
//!
//! 2. **Directive kinds are closed.** [`DirectiveKind`] carries sign, verb,
//!    payload shape and resolution rule for every kind, so the parser,
//!    store and renderer read the same table.
//!
//! 3. **`CanonicalBytes` newtype.** Policy fingerprints are computed only
//!    from JCS-canonical bytes via [`sha256_digest`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `bindcfg-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod diagnostic;
pub mod digest;
pub mod directive;
pub mod error;
pub mod name;
pub mod symbol;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use diagnostic::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use digest::{sha256_digest, ContentDigest, DIGEST_PREFIX};
pub use directive::{Directive, DirectiveKind, Location, Payload, Resolution, Shape};
pub use error::{CanonicalizationError, DigestParseError, NameError};
pub use name::{glob_match, key_of, matches, module_of, normalize, QualifiedName, Segment};
pub use symbol::{IntrospectedSymbol, SymbolKind};
