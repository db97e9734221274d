//! Placement engine — coordinates a single placement decision.
//!
//! One call to [`PlacementEngine::decide`] runs:
//! 1. Filter: drop locations that fail hard constraints
//! 2. Score: rank the survivors on affinity, capacity, spread, latency
//! 3. Select: apply the spec's strategy and requested count
//!
//! The engine holds only configuration. It never mutates its inputs, so
//! concurrent decisions over shared snapshots need no locking.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info, warn};

use crate::error::{PlacementError, PlacementResult};
use crate::filter::{CandidateFilter, IgnoreTaints, TolerationCheck};
use crate::scorer::{ScoringWeights, SpreadContext, rank_candidates};
use crate::strategy::select;
use crate::types::{Location, PlacementDecision, PlacementSpec, SelectedCluster};

/// Stateless decision engine.
#[derive(Debug, Clone)]
pub struct PlacementEngine<T = IgnoreTaints> {
    default_weights: ScoringWeights,
    filter: CandidateFilter<T>,
}

impl PlacementEngine<IgnoreTaints> {
    /// Engine using `default_weights` for specs that carry none.
    pub fn new(default_weights: ScoringWeights) -> Self {
        Self {
            default_weights,
            filter: CandidateFilter::new(),
        }
    }
}

impl Default for PlacementEngine<IgnoreTaints> {
    fn default() -> Self {
        Self::new(ScoringWeights::default())
    }
}

impl<T: TolerationCheck> PlacementEngine<T> {
    /// Replace the toleration check used by the filter.
    pub fn with_toleration_check<U: TolerationCheck>(self, check: U) -> PlacementEngine<U> {
        PlacementEngine {
            default_weights: self.default_weights,
            filter: CandidateFilter::with_toleration_check(check),
        }
    }

    pub fn default_weights(&self) -> &ScoringWeights {
        &self.default_weights
    }

    /// Decide where to place a workload.
    ///
    /// Returns an error only for configuration problems in `spec` or
    /// `locations`. An empty or short decision is a valid result and
    /// carries a `message` saying why.
    pub fn decide(
        &self,
        locations: &[Location],
        spec: &PlacementSpec,
    ) -> PlacementResult<PlacementDecision> {
        let weights = spec.weights.as_ref().unwrap_or(&self.default_weights);
        weights.validate()?;
        check_unique_names(locations)?;

        let outcome = self.filter.filter(locations, spec)?;
        let spread = SpreadContext::from_placements(locations, &spec.existing_placements);
        let candidates = rank_candidates(&outcome.passed, spec, weights, &spread);

        for candidate in &candidates {
            debug!(
                cluster = %candidate.name(),
                score = candidate.score,
                affinity = candidate.breakdown.affinity,
                capacity = candidate.breakdown.capacity,
                spread = candidate.breakdown.spread,
                latency = candidate.breakdown.latency,
                "scored candidate"
            );
        }

        let chosen = select(&candidates, spec.strategy, spec.number_of_clusters);
        let clusters: Vec<SelectedCluster> = chosen
            .iter()
            .map(|c| SelectedCluster {
                cluster_name: c.name().to_string(),
                score: c.score,
                reasons: c.reasons.clone(),
            })
            .collect();

        let rejection_reasons: BTreeMap<String, String> = outcome
            .rejected
            .iter()
            .map(|r| (r.cluster.clone(), r.reason.clone()))
            .collect();

        let message = explain(
            locations.len(),
            outcome.rejected.len(),
            clusters.len(),
            spec.number_of_clusters,
        );
        match &message {
            Some(message) => warn!(strategy = %spec.strategy, %message, "placement incomplete"),
            None => info!(
                strategy = %spec.strategy,
                considered = locations.len(),
                rejected = outcome.rejected.len(),
                selected = clusters.len(),
                "placement decided"
            ),
        }

        Ok(PlacementDecision {
            clusters,
            considered_count: locations.len(),
            rejected_count: outcome.rejected.len(),
            rejection_reasons,
            strategy: spec.strategy,
            requested: spec.number_of_clusters,
            message,
        })
    }
}

fn check_unique_names(locations: &[Location]) -> PlacementResult<()> {
    let mut seen = HashSet::with_capacity(locations.len());
    for location in locations {
        if !seen.insert(location.name.as_str()) {
            return Err(PlacementError::DuplicateCluster(location.name.clone()));
        }
    }
    Ok(())
}

/// Explain an empty or short decision. `None` when the request is met.
fn explain(considered: usize, rejected: usize, selected: usize, requested: i32) -> Option<String> {
    if considered == 0 {
        return Some("no candidate clusters supplied".to_string());
    }
    if selected == 0 {
        return Some(format!(
            "no cluster satisfied the placement constraints ({rejected} of {considered} rejected)"
        ));
    }
    if requested > 0 && selected < requested as usize {
        return Some(format!(
            "requested {requested} clusters, only {selected} satisfied the placement constraints"
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{AffinityTerm, LabelSelector, MatchExpression};
    use crate::strategy::PlacementStrategy;

    fn make_location(name: &str, zone: &str) -> Location {
        Location::new(name)
            .with_zone(zone)
            .with_label("env", "prod")
    }

    fn engine() -> PlacementEngine {
        PlacementEngine::default()
    }

    fn prod_spec(count: i32) -> PlacementSpec {
        PlacementSpec {
            location_selector: LabelSelector::new(vec![
                MatchExpression::equals("env", "prod").unwrap(),
            ]),
            number_of_clusters: count,
            ..Default::default()
        }
    }

    #[test]
    fn decides_top_clusters() {
        let locations = vec![
            make_location("c1", "a"),
            make_location("c2", "b").with_label("gpu", "true"),
            make_location("c3", "c"),
        ];
        let spec = PlacementSpec {
            preferred_affinity: vec![AffinityTerm::new(
                None,
                LabelSelector::new(vec![MatchExpression::equals("gpu", "true").unwrap()]),
            )],
            ..prod_spec(2)
        };

        let decision = engine().decide(&locations, &spec).unwrap();
        assert_eq!(decision.cluster_names(), vec!["c2", "c1"]);
        assert_eq!(decision.considered_count, 3);
        assert_eq!(decision.rejected_count, 0);
        assert!(decision.message.is_none());
        assert_eq!(decision.clusters[0].reasons.len(), 4);
    }

    #[test]
    fn reasons_name_unmatched_preferred_terms() {
        let term = |name: &str| {
            AffinityTerm::new(
                Some(name.to_string()),
                LabelSelector::new(vec![MatchExpression::equals(name, "true").unwrap()]),
            )
        };
        let locations = vec![make_location("c1", "a").with_label("gpu", "true")];
        let spec = PlacementSpec {
            preferred_affinity: vec![term("gpu"), term("ssd")],
            ..prod_spec(1)
        };

        let decision = engine().decide(&locations, &spec).unwrap();
        assert_eq!(
            decision.clusters[0].reasons[0],
            "affinity: 1/2 preferred terms matched; unmatched: ssd [ssd In (true)] (0.50 × 0.40)"
        );
    }

    #[test]
    fn records_rejections() {
        let locations = vec![
            make_location("c1", "a"),
            Location::new("staging").with_label("env", "staging"),
        ];
        let decision = engine().decide(&locations, &prod_spec(0)).unwrap();

        assert_eq!(decision.cluster_names(), vec!["c1"]);
        assert_eq!(decision.rejected_count, 1);
        assert!(decision.rejection_reasons["staging"].contains("env In (prod)"));
    }

    #[test]
    fn nothing_matching_is_not_an_error() {
        let locations = vec![Location::new("staging").with_label("env", "staging")];
        let decision = engine().decide(&locations, &prod_spec(1)).unwrap();

        assert!(decision.is_empty());
        assert!(decision.message.unwrap().contains("1 of 1 rejected"));
    }

    #[test]
    fn short_decision_explains_itself() {
        let locations = vec![make_location("c1", "a")];
        let decision = engine().decide(&locations, &prod_spec(3)).unwrap();

        assert_eq!(decision.clusters.len(), 1);
        assert_eq!(
            decision.message.as_deref(),
            Some("requested 3 clusters, only 1 satisfied the placement constraints")
        );
    }

    #[test]
    fn duplicate_cluster_names_are_rejected() {
        let locations = vec![make_location("c1", "a"), make_location("c1", "b")];
        let err = engine().decide(&locations, &prod_spec(1)).unwrap_err();
        assert_eq!(err, PlacementError::DuplicateCluster("c1".to_string()));
    }

    #[test]
    fn spec_weights_override_engine_defaults() {
        let locations = vec![
            make_location("roomy", "a")
                .with_annotation("capacity.cpu", "8")
                .with_annotation("available.cpu", "8"),
            make_location("tight", "b")
                .with_annotation("capacity.cpu", "8")
                .with_annotation("available.cpu", "1"),
        ];
        let spec = PlacementSpec {
            weights: Some(ScoringWeights {
                capacity: 1.0,
                ..ScoringWeights::zero()
            }),
            ..prod_spec(1)
        };

        let decision = engine().decide(&locations, &spec).unwrap();
        assert_eq!(decision.cluster_names(), vec!["roomy"]);
        assert_eq!(decision.clusters[0].score, 1.0);
    }

    #[test]
    fn invalid_engine_weights_surface_as_error() {
        let engine = PlacementEngine::new(ScoringWeights {
            spread: f64::INFINITY,
            ..Default::default()
        });
        let err = engine.decide(&[], &PlacementSpec::default()).unwrap_err();
        assert!(matches!(err, PlacementError::InvalidWeight { .. }));
    }

    #[test]
    fn existing_placements_steer_spread() {
        let locations = vec![
            make_location("a1", "a"),
            make_location("a2", "a"),
            make_location("b1", "b"),
        ];
        let spec = PlacementSpec {
            existing_placements: vec!["a1".to_string()],
            weights: Some(ScoringWeights {
                spread: 1.0,
                ..ScoringWeights::zero()
            }),
            strategy: PlacementStrategy::ScoreBased,
            ..prod_spec(1)
        };

        let decision = engine().decide(&locations, &spec).unwrap();
        assert_eq!(decision.cluster_names(), vec!["b1"]);
    }

    #[test]
    fn engine_does_not_mutate_inputs() {
        let locations = vec![make_location("c1", "a"), make_location("c2", "b")];
        let spec = prod_spec(1);
        let locations_before = locations.clone();
        let spec_before = spec.clone();

        engine().decide(&locations, &spec).unwrap();
        assert_eq!(locations, locations_before);
        assert_eq!(spec, spec_before);
    }

    #[test]
    fn toleration_check_feeds_rejections() {
        struct NoDedicated;
        impl TolerationCheck for NoDedicated {
            fn check(
                &self,
                location: &Location,
                _: &[crate::types::Toleration],
            ) -> Result<(), String> {
                match location.labels.get("dedicated") {
                    Some(team) => Err(format!("dedicated to {team}")),
                    None => Ok(()),
                }
            }
        }

        let locations = vec![
            make_location("shared", "a"),
            make_location("ml-only", "b").with_label("dedicated", "ml"),
        ];
        let engine = engine().with_toleration_check(NoDedicated);
        let decision = engine.decide(&locations, &prod_spec(0)).unwrap();

        assert_eq!(decision.cluster_names(), vec!["shared"]);
        assert_eq!(
            decision.rejection_reasons["ml-only"],
            "taints not tolerated: dedicated to ml"
        );
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PlacementEngine>();
    }
}
