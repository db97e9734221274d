//! TMC placement decision engine — filtering, scoring, strategy selection.
//!
//! This crate decides which clusters a workload lands on. It does NOT
//! watch resources or persist anything (that's the controller). Given
//! candidate locations and a placement spec it filters, scores and selects,
//! and returns an explainable decision.
//!
//! # Components
//!
//! - **`labels`** — Label selectors and affinity terms
//! - **`filter`** — Candidate filter (hard constraints, toleration hook)
//! - **`scorer`** — Multi-criteria scoring (affinity, capacity, spread, latency)
//! - **`strategy`** — Selection strategies (score-based, balanced, packed, spread)
//! - **`engine`** — Decision orchestration
//! - **`convert`** — Type conversions from `tmc-core` API types

pub mod convert;
pub mod engine;
pub mod error;
pub mod filter;
pub mod labels;
pub mod scorer;
pub mod strategy;
pub mod types;

pub use convert::{
    cluster_to_location, clusters_to_locations, policy_to_spec, selector_from_raw,
    strategy_from_config, weights_from_config,
};
pub use engine::PlacementEngine;
pub use error::{PlacementError, PlacementResult};
pub use filter::{CandidateFilter, FilterOutcome, IgnoreTaints, Rejection, TolerationCheck, filter};
pub use labels::{AffinityTerm, LabelSelector, Labels, MatchExpression, Operator};
pub use scorer::{
    CandidateScore, Criterion, CriterionScores, ScoringWeights, SpreadContext, rank_candidates,
    score_candidate,
};
pub use strategy::{PlacementStrategy, select};
pub use types::{Candidate, Location, PlacementDecision, PlacementSpec, SelectedCluster, Toleration};
