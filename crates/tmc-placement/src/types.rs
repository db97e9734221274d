//! Engine-side data model: locations, placement specs, candidates and
//! decisions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PlacementResult;
use crate::labels::{AffinityTerm, LabelSelector, Labels};
use crate::scorer::{CandidateScore, CriterionScores, ScoringWeights};
use crate::strategy::PlacementStrategy;

/// Opaque toleration entry. Interpreted only by a
/// [`TolerationCheck`](crate::filter::TolerationCheck).
pub type Toleration = serde_json::Value;

// ── Locations ──────────────────────────────────────────────────────

/// A cluster the workload could be placed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Location {
    /// Cluster name. Unique within a decision; also the tie-breaker.
    pub name: String,
    pub labels: Labels,
    pub zone: Option<String>,
    pub region: Option<String>,
    /// Free-form annotations, including `capacity.*` / `available.*`.
    pub annotations: BTreeMap<String, String>,
}

impl Location {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Topology domain used for spreading: the zone, else the region.
    pub fn topology_domain(&self) -> Option<&str> {
        self.zone.as_deref().or(self.region.as_deref())
    }
}

// ── Placement spec ─────────────────────────────────────────────────

/// What is being placed, and how. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlacementSpec {
    pub location_selector: LabelSelector,
    /// Hard constraints: every term must match.
    pub required_affinity: Vec<AffinityTerm>,
    /// Soft preferences, scored but never enforced.
    pub preferred_affinity: Vec<AffinityTerm>,
    pub tolerations: Vec<Toleration>,
    /// Requested cluster count. Zero or negative selects every passing cluster.
    pub number_of_clusters: i32,
    pub strategy: PlacementStrategy,
    /// Weights for this decision. `None` uses the engine's defaults.
    pub weights: Option<ScoringWeights>,
    /// Clusters already hosting the workload (spread context).
    pub existing_placements: Vec<String>,
}

impl PlacementSpec {
    /// Check every selector, affinity term and weight.
    pub fn validate(&self) -> PlacementResult<()> {
        self.location_selector.validate()?;
        for term in self.required_affinity.iter().chain(&self.preferred_affinity) {
            term.validate()?;
        }
        if let Some(weights) = &self.weights {
            weights.validate()?;
        }
        Ok(())
    }
}

// ── Candidates ─────────────────────────────────────────────────────

/// Per-decision record for a location that passed filtering.
///
/// Owned by a single engine invocation and dropped once the decision is
/// assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub location: Location,
    /// Weighted total in `0.0..=1.0`.
    pub score: f64,
    pub breakdown: CriterionScores,
    /// One line per criterion explaining its contribution.
    pub reasons: Vec<String>,
}

impl Candidate {
    pub fn new(location: Location, scored: CandidateScore) -> Self {
        Self {
            location,
            score: scored.total,
            breakdown: scored.breakdown,
            reasons: scored.reasons,
        }
    }

    pub fn name(&self) -> &str {
        &self.location.name
    }
}

// ── Decisions ──────────────────────────────────────────────────────

/// A cluster chosen by the selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedCluster {
    pub cluster_name: String,
    pub score: f64,
    pub reasons: Vec<String>,
}

/// The engine's answer, returned to the controller for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementDecision {
    /// Chosen clusters in pick order.
    pub clusters: Vec<SelectedCluster>,
    pub considered_count: usize,
    pub rejected_count: usize,
    /// Cluster name → unmet constraint.
    pub rejection_reasons: BTreeMap<String, String>,
    pub strategy: PlacementStrategy,
    pub requested: i32,
    /// Set when the decision is empty or short of the requested count.
    pub message: Option<String>,
}

impl PlacementDecision {
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn cluster_names(&self) -> Vec<&str> {
        self.clusters.iter().map(|c| c.cluster_name.as_str()).collect()
    }
}
