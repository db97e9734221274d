//! Type conversions between API-layer types and placement types.
//!
//! Bridges `tmc_core::{ClusterInfo, PlacementPolicy, TmcConfig}` to the
//! engine's `Location`, `PlacementSpec` and `ScoringWeights`. Everything
//! string-typed on the API side (operators, weight names) is validated here.

use tmc_core::{
    ClusterInfo, PlacementPolicy, REGION_LABEL, RawAffinityTerm, RawLabelSelector, TmcConfig,
    ZONE_LABEL,
};

use crate::error::PlacementResult;
use crate::labels::{AffinityTerm, LabelSelector, MatchExpression, Operator};
use crate::scorer::ScoringWeights;
use crate::strategy::PlacementStrategy;
use crate::types::{Location, PlacementSpec};

/// Convert a [`ClusterInfo`] to a [`Location`].
///
/// Zone and region come from the explicit fields, falling back to the
/// well-known topology labels.
pub fn cluster_to_location(cluster: &ClusterInfo) -> Location {
    let zone = cluster
        .zone
        .clone()
        .or_else(|| cluster.labels.get(ZONE_LABEL).cloned());
    let region = cluster
        .region
        .clone()
        .or_else(|| cluster.labels.get(REGION_LABEL).cloned());

    Location {
        name: cluster.name.clone(),
        labels: cluster
            .labels
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        zone,
        region,
        annotations: cluster
            .annotations
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

pub fn clusters_to_locations(clusters: &[ClusterInfo]) -> Vec<Location> {
    clusters.iter().map(cluster_to_location).collect()
}

/// Convert a raw selector. `matchLabels` entries become `In` expressions,
/// sorted by key, ahead of the explicit `matchExpressions`.
pub fn selector_from_raw(raw: &RawLabelSelector) -> PlacementResult<LabelSelector> {
    let mut match_labels: Vec<(&String, &String)> = raw.match_labels.iter().collect();
    match_labels.sort();

    let mut expressions = Vec::with_capacity(match_labels.len() + raw.match_expressions.len());
    for (key, value) in match_labels {
        expressions.push(MatchExpression::equals(key.as_str(), value.as_str())?);
    }
    for expr in &raw.match_expressions {
        let operator: Operator = expr.operator.parse()?;
        expressions.push(MatchExpression::new(
            expr.key.as_str(),
            operator,
            expr.values.clone(),
        )?);
    }
    Ok(LabelSelector::new(expressions))
}

fn terms_from_raw(raw: &[RawAffinityTerm]) -> PlacementResult<Vec<AffinityTerm>> {
    raw.iter()
        .map(|term| -> PlacementResult<AffinityTerm> {
            Ok(AffinityTerm::new(term.name.clone(), selector_from_raw(&term.selector)?))
        })
        .collect()
}

/// Convert a [`PlacementPolicy`] to a validated [`PlacementSpec`].
///
/// A missing strategy uses `default_strategy`; an unknown one falls back to
/// score-based. Selector and weight problems are errors.
pub fn policy_to_spec(
    policy: &PlacementPolicy,
    default_strategy: PlacementStrategy,
) -> PlacementResult<PlacementSpec> {
    let weights = policy
        .scoring_weights
        .as_ref()
        .map(ScoringWeights::from_map)
        .transpose()?;

    Ok(PlacementSpec {
        location_selector: selector_from_raw(&policy.location_selector)?,
        required_affinity: terms_from_raw(&policy.required_affinity)?,
        preferred_affinity: terms_from_raw(&policy.preferred_affinity)?,
        tolerations: policy.tolerations.clone(),
        number_of_clusters: policy.number_of_clusters,
        strategy: PlacementStrategy::parse_or(policy.strategy.as_deref(), default_strategy),
        weights,
        existing_placements: policy.existing_placements.clone(),
    })
}

/// Default weights from tmc.toml, or the built-in defaults.
pub fn weights_from_config(config: &TmcConfig) -> PlacementResult<ScoringWeights> {
    match config.weights() {
        Some(map) => ScoringWeights::from_map(map),
        None => Ok(ScoringWeights::default()),
    }
}

/// Default strategy from tmc.toml, or score-based.
pub fn strategy_from_config(config: &TmcConfig) -> PlacementStrategy {
    PlacementStrategy::parse_or(config.default_strategy(), PlacementStrategy::ScoreBased)
}
