//! Cross-fragment scope resolution.
//!
//! Script fragments of one document usually share a single top-level
//! scope: a variable declared by an early `<script>` is read by a later
//! one. Verifying each fragment alone would flag the declaration as unused
//! and the read as undefined, so fragments are verified twice:
//!
//! 1. every shared fragment is verified with all rules muted, only to
//!    record a [`ScopeObservation`];
//! 2. every shared fragment is verified for real with
//!    [`ScopeAdjustments`] derived from the observations of the others:
//!    names read by *later* fragments count as used, names declared by
//!    *earlier* fragments count as defined.
//!
//! Declarations never flow backwards. Module fragments (and every fragment
//! when the configuration says `sourceType: module`) skip both passes,
//! are verified once on their own, and neither give nor receive names.

use crate::fragment::CodeFragment;
use crate::linter::{AnalysisConfig, LocationContext, SourceType, Verifier, VerifyRequest};
use crate::syntax::Diagnostic;
use std::collections::BTreeSet;

/// What one fragment reads without declaring, and what it declares
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeObservation {
    /// Names referenced but not resolved inside the fragment
    pub through: BTreeSet<String>,
    /// Names declared in the fragment's top-level scope
    pub declared: BTreeSet<String>,
}

/// Names injected into a fragment's analysis during the second pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeAdjustments {
    /// Read by a later fragment: never report these as unused
    pub used_later: BTreeSet<String>,
    /// Declared by an earlier fragment: never report these as undefined
    pub declared_earlier: BTreeSet<String>,
}

/// How the verifier should treat the top-level scope of one call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScopePass {
    /// Analyse the text on its own
    #[default]
    Standalone,
    /// Record a [`ScopeObservation`]; diagnostics are discarded
    Observe,
    /// Apply the adjustments before the rules run
    Apply(ScopeAdjustments),
}

fn is_standalone(fragment: &CodeFragment, config: &AnalysisConfig) -> bool {
    config.source_type == SourceType::Module || fragment.is_module()
}

/// Verify every fragment, returning fragment-local diagnostics per fragment
///
/// The result has one entry per fragment of `fragments`, in slice order.
/// After the observation pass, fragments are verified in document order.
pub fn verify_fragments<V: Verifier + ?Sized>(
    fragments: &[CodeFragment],
    config: &AnalysisConfig,
    location: &LocationContext,
    preserve_state: bool,
    verifier: &mut V,
) -> Vec<Vec<Diagnostic>> {
    let shared: Vec<&CodeFragment> = fragments
        .iter()
        .filter(|fragment| !is_standalone(fragment, config))
        .collect();

    // First pass: collect needed and declared globals of every shared script
    let muted = config.muted();
    let observations: Vec<ScopeObservation> = shared
        .iter()
        .map(|fragment| {
            let request = VerifyRequest {
                text: fragment.text(),
                config: &muted,
                location,
                preserve_state,
                scope: &ScopePass::Observe,
            };
            verifier.verify(&request).observation.unwrap_or_default()
        })
        .collect();

    if !shared.is_empty() {
        tracing::debug!(fragments = shared.len(), "scope observation pass complete");
    }

    // Second pass: verify for real, shared scripts with their adjustments
    let mut results = Vec::with_capacity(fragments.len());
    let mut shared_position = 0;
    for fragment in fragments {
        let scope = if is_standalone(fragment, config) {
            ScopePass::Standalone
        } else {
            let adjustments = adjustments_for(&observations, shared_position);
            shared_position += 1;
            tracing::trace!(
                fragment = fragment.index(),
                used_later = adjustments.used_later.len(),
                declared_earlier = adjustments.declared_earlier.len(),
                "verifying with shared scope"
            );
            ScopePass::Apply(adjustments)
        };

        let request = VerifyRequest {
            text: fragment.text(),
            config,
            location,
            preserve_state,
            scope: &scope,
        };
        results.push(verifier.verify(&request).diagnostics);
    }

    results
}

/// Adjustments for the `i`-th shared fragment
#[must_use]
pub fn adjustments_for(observations: &[ScopeObservation], i: usize) -> ScopeAdjustments {
    let used_later = observations
        .iter()
        .skip(i + 1)
        .flat_map(|o| o.through.iter().cloned())
        .collect();
    let declared_earlier = observations
        .iter()
        .take(i)
        .flat_map(|o| o.declared.iter().cloned())
        .collect();

    ScopeAdjustments {
        used_later,
        declared_earlier,
    }
}
