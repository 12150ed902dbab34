//! # bindcfg-store — Policy Store
//!
//! Holds parsed directives indexed by `(kind, normalized target key)` and
//! answers the precedence questions: which exclusive directive wins for a
//! name, which accumulating directives apply and in what order.
//!
//! Directives are applied one at a time in source order. Overriding an
//! exclusive directive is ordinary and silent apart from the
//! [`OverrideObserver`] hook; applying out of order is a [`ConflictError`].

pub mod error;
pub mod observer;
pub mod store;

pub use error::ConflictError;
pub use observer::{OverrideObserver, RecordingObserver, TracingObserver};
pub use store::{target_key, PolicyStore};
