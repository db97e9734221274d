//! Candidate filter — hard constraints.
//!
//! A location survives filtering when it matches the location selector,
//! every required affinity term, and the toleration check. Preferred
//! affinity is left to the scorer. Passing locations keep their input order.

use tracing::debug;

use crate::error::PlacementResult;
use crate::types::{Location, PlacementSpec, Toleration};

/// Decides whether a location's taints are tolerated.
///
/// Returns the reason for rejection on failure.
pub trait TolerationCheck {
    fn check(&self, location: &Location, tolerations: &[Toleration]) -> Result<(), String>;
}

/// Accepts every location. Clusters carry no taint data yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreTaints;

impl TolerationCheck for IgnoreTaints {
    fn check(&self, _location: &Location, _tolerations: &[Toleration]) -> Result<(), String> {
        Ok(())
    }
}

/// A location removed by the filter, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub cluster: String,
    pub reason: String,
}

/// Result of filtering: survivors in input order plus rejections.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome<'a> {
    pub passed: Vec<&'a Location>,
    pub rejected: Vec<Rejection>,
}

/// Applies hard constraints using a pluggable toleration check.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter<T = IgnoreTaints> {
    tolerations: T,
}

impl CandidateFilter<IgnoreTaints> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: TolerationCheck> CandidateFilter<T> {
    pub fn with_toleration_check(tolerations: T) -> Self {
        Self { tolerations }
    }

    /// Filter `candidates` against `spec`.
    ///
    /// The spec is validated before any candidate is looked at, so a
    /// malformed selector is reported even for an empty candidate list.
    pub fn filter<'a>(
        &self,
        candidates: &'a [Location],
        spec: &PlacementSpec,
    ) -> PlacementResult<FilterOutcome<'a>> {
        spec.validate()?;

        let mut outcome = FilterOutcome::default();
        for location in candidates {
            match self.rejection_reason(location, spec) {
                None => outcome.passed.push(location),
                Some(reason) => {
                    debug!(cluster = %location.name, %reason, "candidate rejected");
                    outcome.rejected.push(Rejection {
                        cluster: location.name.clone(),
                        reason,
                    });
                }
            }
        }
        Ok(outcome)
    }

    fn rejection_reason(&self, location: &Location, spec: &PlacementSpec) -> Option<String> {
        if let Some(expr) = spec.location_selector.first_unmatched(&location.labels) {
            return Some(format!("location selector not matched: {expr}"));
        }

        if let Some(term) = spec
            .required_affinity
            .iter()
            .find(|term| !term.matches(&location.labels))
        {
            return Some(format!("required affinity not matched: {term}"));
        }

        self.tolerations
            .check(location, &spec.tolerations)
            .err()
            .map(|reason| format!("taints not tolerated: {reason}"))
    }
}

/// Filter with the default toleration check.
pub fn filter<'a>(
    candidates: &'a [Location],
    spec: &PlacementSpec,
) -> PlacementResult<FilterOutcome<'a>> {
    CandidateFilter::new().filter(candidates, spec)
}
