//! The collector capability contract
//!
//! A collector turns a [`GenerationContext`] into one partial metadata
//! fragment. Collectors are independently fallible: a missing optional input
//! file or an unparsable source must degrade that single fragment to a
//! documented empty-but-valid shape instead of aborting the whole pipeline.
//! [`Collector::collect_with_fallback`] is that degradation path: it never
//! fails, and it logs what it dropped.

use crate::context::GenerationContext;
use crate::error::Result;

/// A unit that produces one partial metadata fragment from a generation
/// context
///
/// Implementations must uphold two guarantees:
///
/// - `collect_minimal` never fails and returns the empty-but-valid shape of
///   the fragment (same containers, no content);
/// - `validate` is a structural check only (required fields present,
///   container shapes correct), never a business-logic judgement.
pub trait Collector {
    /// The fragment this collector produces
    type Fragment;

    /// Short name used in logs and diagnostics
    fn name(&self) -> &'static str;

    /// Produce the fragment; may fail
    fn collect(&self, ctx: &GenerationContext) -> Result<Self::Fragment>;

    /// Produce the documented minimal fragment; must never fail
    fn collect_minimal(&self, ctx: &GenerationContext) -> Self::Fragment;

    /// Produce the fragment, silently degrading to the minimal shape on any
    /// failure
    ///
    /// The degradation is logged at `warn` level so a missing file is
    /// diagnosable without being fatal.
    fn collect_with_fallback(&self, ctx: &GenerationContext) -> Self::Fragment {
        match self.collect(ctx) {
            Ok(fragment) => fragment,
            Err(err) => {
                tracing::warn!(
                    collector = self.name(),
                    "collection degraded to minimal fragment: {err}"
                );
                self.collect_minimal(ctx)
            }
        }
    }

    /// Structural validation of a fragment
    fn validate(&self, fragment: &Self::Fragment) -> bool;
}
