//! Input shapes produced by the TMC API layer.
//!
//! These mirror the JSON the controller hands over: operators and
//! strategies are still plain strings here. Validation happens when the
//! placement engine converts them (see `tmc_placement::convert`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a physical cluster (its location name).
pub type ClusterName = String;

/// Well-known label carrying a cluster's availability zone.
pub const ZONE_LABEL: &str = "topology.kubernetes.io/zone";

/// Well-known label carrying a cluster's region.
pub const REGION_LABEL: &str = "topology.kubernetes.io/region";

// ── Clusters ───────────────────────────────────────────────────────

/// A registered cluster as described by the API layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInfo {
    pub name: ClusterName,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Explicit zone. Falls back to [`ZONE_LABEL`] when absent.
    #[serde(default)]
    pub zone: Option<String>,
    /// Explicit region. Falls back to [`REGION_LABEL`] when absent.
    #[serde(default)]
    pub region: Option<String>,
    /// Free-form annotations, e.g. `capacity.cpu: "8"`, `available.cpu: "6"`.
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

// ── Placement policy ───────────────────────────────────────────────

/// A label match expression before operator validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawMatchExpression {
    pub key: String,
    /// One of `In`, `NotIn`, `Exists`, `DoesNotExist`.
    pub operator: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Label selector: `matchLabels` and `matchExpressions`, ANDed together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawLabelSelector {
    #[serde(default)]
    pub match_labels: HashMap<String, String>,
    #[serde(default)]
    pub match_expressions: Vec<RawMatchExpression>,
}

/// A named affinity term. The name only shows up in diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawAffinityTerm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub selector: RawLabelSelector,
}

/// Placement specification for a workload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlacementPolicy {
    #[serde(default)]
    pub location_selector: RawLabelSelector,
    #[serde(default)]
    pub required_affinity: Vec<RawAffinityTerm>,
    #[serde(default)]
    pub preferred_affinity: Vec<RawAffinityTerm>,
    /// Opaque until clusters carry taint data.
    #[serde(default)]
    pub tolerations: Vec<serde_json::Value>,
    /// Requested cluster count. Zero or negative means "all passing".
    #[serde(default)]
    pub number_of_clusters: i32,
    /// `ScoreBased`, `Balanced`, `Packed` or `Spread`.
    #[serde(default)]
    pub strategy: Option<String>,
    /// Weight name → weight. Known names: affinity, capacity, spread, latency.
    #[serde(default)]
    pub scoring_weights: Option<HashMap<String, f64>>,
    /// Clusters already hosting this workload.
    #[serde(default)]
    pub existing_placements: Vec<ClusterName>,
}
