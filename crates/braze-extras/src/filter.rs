//! Pluggable predicate deciding which implementation classes may be
//! instantiated.

use braze_core::ClassToken;

/// Policy predicate consulted for every bare-class registration made through
/// a filtered transaction.
///
/// Implementations must be total (defined for every candidate) and
/// deterministic for a fixed candidate, with no side effects. The predicate
/// is resolved from the registry once per transaction creation and invoked
/// once per registration call, with no ordering guarantees between
/// candidates.
pub trait InstantiationFilter: Send + Sync {
    /// Returns `true` when registrations of `class` must be suppressed.
    fn matches(&self, class: &ClassToken) -> bool;
}
