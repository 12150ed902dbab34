//! Override observation.
//!
//! Replacing an exclusive directive is never an error, but rule authors
//! want to know when a later rule block silently overrides an earlier one.

use bindcfg_core::Directive;
use tracing::debug;

/// Notified whenever an exclusive directive replaces an earlier winner.
pub trait OverrideObserver {
    /// `previous` lost to `winner` for the same kind and key.
    fn on_override(&mut self, previous: &Directive, winner: &Directive);
}

impl<F> OverrideObserver for F
where
    F: FnMut(&Directive, &Directive),
{
    fn on_override(&mut self, previous: &Directive, winner: &Directive) {
        self(previous, winner)
    }
}

/// Logs overrides at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl OverrideObserver for TracingObserver {
    fn on_override(&mut self, previous: &Directive, winner: &Directive) {
        debug!(
            kind = %winner.kind,
            target = %winner.target,
            previous = %previous.location,
            winner = %winner.location,
            "directive overridden"
        );
    }
}

/// Records every override, for tests and `explain`.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    /// `(previous, winner)` pairs in the order they happened.
    pub overrides: Vec<(Directive, Directive)>,
}

impl OverrideObserver for RecordingObserver {
    fn on_override(&mut self, previous: &Directive, winner: &Directive) {
        self.overrides.push((previous.clone(), winner.clone()));
    }
}
