//! Candidate scoring for placement decisions.
//!
//! Evaluates filtered candidates using a weighted combination of:
//! - **Affinity**: fraction of preferred affinity terms the cluster matches
//! - **Capacity**: available-vs-total ratio from capacity annotations
//! - **Spread**: prefer zones less occupied by existing placements
//! - **Latency**: placeholder until network measurements exist
//!
//! Scoring is a pure function of its inputs and never fails. Missing data
//! yields a neutral criterion score rather than zero.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{PlacementError, PlacementResult};
use crate::types::{Candidate, Location, PlacementSpec};

/// Affinity score when the spec has no preferred terms.
pub const NEUTRAL_AFFINITY: f64 = 1.0;
/// Capacity score for clusters without usable capacity annotations.
pub const NEUTRAL_CAPACITY: f64 = 0.5;
/// Spread score without placement context or topology data.
pub const NEUTRAL_SPREAD: f64 = 1.0;
/// Latency score until measurements are available.
pub const NEUTRAL_LATENCY: f64 = 1.0;

const CAPACITY_PREFIX: &str = "capacity.";
const AVAILABLE_PREFIX: &str = "available.";

/// One scoring dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    Affinity,
    Capacity,
    Spread,
    Latency,
}

impl Criterion {
    pub const ALL: [Criterion; 4] = [
        Criterion::Affinity,
        Criterion::Capacity,
        Criterion::Spread,
        Criterion::Latency,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Criterion::Affinity => "affinity",
            Criterion::Capacity => "capacity",
            Criterion::Spread => "spread",
            Criterion::Latency => "latency",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Sub-score used when the criterion has nothing to go on.
    pub fn neutral(self) -> f64 {
        match self {
            Criterion::Affinity => NEUTRAL_AFFINITY,
            Criterion::Capacity => NEUTRAL_CAPACITY,
            Criterion::Spread => NEUTRAL_SPREAD,
            Criterion::Latency => NEUTRAL_LATENCY,
        }
    }
}

/// Weights for the scoring criteria.
///
/// Weights are non-negative. A zero weight drops the criterion from the
/// weighted sum; all-zero weights fall back to an unweighted mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub affinity: f64,
    pub capacity: f64,
    pub spread: f64,
    pub latency: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            affinity: 0.4,
            capacity: 0.3,
            spread: 0.2,
            latency: 0.1,
        }
    }
}

impl ScoringWeights {
    /// All weights zero; the caller sets the ones it wants.
    pub fn zero() -> Self {
        Self {
            affinity: 0.0,
            capacity: 0.0,
            spread: 0.0,
            latency: 0.0,
        }
    }

    /// Build weights from a name → weight map. Criteria not listed get
    /// weight zero; unknown names are an error.
    pub fn from_map(map: &HashMap<String, f64>) -> PlacementResult<Self> {
        let mut weights = Self::zero();
        for (name, &value) in map {
            let criterion = Criterion::from_name(name)
                .ok_or_else(|| PlacementError::UnknownWeightKey(name.clone()))?;
            *weights.get_mut(criterion) = value;
        }
        weights.validate()?;
        Ok(weights)
    }

    pub fn get(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Affinity => self.affinity,
            Criterion::Capacity => self.capacity,
            Criterion::Spread => self.spread,
            Criterion::Latency => self.latency,
        }
    }

    fn get_mut(&mut self, criterion: Criterion) -> &mut f64 {
        match criterion {
            Criterion::Affinity => &mut self.affinity,
            Criterion::Capacity => &mut self.capacity,
            Criterion::Spread => &mut self.spread,
            Criterion::Latency => &mut self.latency,
        }
    }

    pub fn validate(&self) -> PlacementResult<()> {
        for criterion in Criterion::ALL {
            let value = self.get(criterion);
            if !value.is_finite() || value < 0.0 {
                return Err(PlacementError::InvalidWeight {
                    name: criterion.name().to_string(),
                    value,
                });
            }
        }
        Ok(())
    }

    /// Sum of the weights that take part in the weighted combination.
    pub fn active_total(&self) -> f64 {
        Criterion::ALL
            .into_iter()
            .map(|c| self.get(c))
            .filter(|w| *w > 0.0)
            .sum()
    }
}

/// Per-criterion sub-scores, each in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScores {
    pub affinity: f64,
    pub capacity: f64,
    pub spread: f64,
    pub latency: f64,
}

impl CriterionScores {
    pub fn get(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Affinity => self.affinity,
            Criterion::Capacity => self.capacity,
            Criterion::Spread => self.spread,
            Criterion::Latency => self.latency,
        }
    }
}

/// Output of [`score_candidate`].
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub total: f64,
    pub breakdown: CriterionScores,
    pub reasons: Vec<String>,
}

/// Where existing placements of the workload already sit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpreadContext {
    domains: BTreeMap<String, usize>,
    total: usize,
}

impl SpreadContext {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolve `existing` cluster names against `locations` and count
    /// placements per topology domain. Unknown names and clusters without
    /// topology data are skipped.
    pub fn from_placements(locations: &[Location], existing: &[String]) -> Self {
        let mut ctx = Self::empty();
        for name in existing {
            if let Some(domain) = locations
                .iter()
                .find(|l| &l.name == name)
                .and_then(Location::topology_domain)
            {
                ctx.record(domain);
            }
        }
        ctx
    }

    pub fn record(&mut self, domain: &str) {
        *self.domains.entry(domain.to_string()).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn occupancy(&self, domain: &str) -> usize {
        self.domains.get(domain).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Affinity: fraction of preferred terms matched. The reason names every
/// unmatched term.
pub fn affinity_score(location: &Location, spec: &PlacementSpec) -> (f64, String) {
    let total = spec.preferred_affinity.len();
    if total == 0 {
        return (
            NEUTRAL_AFFINITY,
            "affinity: no preferred terms".to_string(),
        );
    }

    let unmatched: Vec<String> = spec
        .preferred_affinity
        .iter()
        .filter(|term| !term.matches(&location.labels))
        .map(ToString::to_string)
        .collect();
    let matched = total - unmatched.len();

    let mut reason = format!("affinity: {matched}/{total} preferred terms matched");
    if !unmatched.is_empty() {
        reason.push_str(&format!("; unmatched: {}", unmatched.join(", ")));
    }
    (matched as f64 / total as f64, reason)
}

/// Capacity: mean available/total ratio over resources that declare both a
/// `capacity.<resource>` and an `available.<resource>` annotation.
pub fn capacity_score(location: &Location) -> (f64, String) {
    let mut ratios: Vec<(String, f64)> = Vec::new();
    let mut skipped: Vec<String> = Vec::new();
    let mut unpaired: Vec<String> = Vec::new();

    for (key, total_raw) in &location.annotations {
        let Some(resource) = key.strip_prefix(CAPACITY_PREFIX) else {
            continue;
        };
        let available_key = format!("{AVAILABLE_PREFIX}{resource}");
        let Some(available_raw) = location.annotations.get(&available_key) else {
            unpaired.push(format!("no {available_key}"));
            continue;
        };
        let ratio = match (parse_quantity(total_raw), parse_quantity(available_raw)) {
            (Some(total), Some(available)) if total > 0.0 => Some(available / total),
            _ => None,
        };
        match ratio.filter(|r| r.is_finite()) {
            Some(ratio) => ratios.push((resource.to_string(), ratio.clamp(0.0, 1.0))),
            None => skipped.push(resource.to_string()),
        }
    }

    let mut reason = if ratios.is_empty() {
        format!("capacity: no capacity data, neutral {NEUTRAL_CAPACITY:.2}")
    } else {
        let parts: Vec<String> = ratios
            .iter()
            .map(|(resource, ratio)| format!("{resource} {ratio:.2}"))
            .collect();
        format!("capacity: available ratio {}", parts.join(", "))
    };
    if !skipped.is_empty() {
        reason.push_str(&format!("; ignored unparseable {}", skipped.join(", ")));
    }
    if !unpaired.is_empty() {
        reason.push_str(&format!("; ignored {}", unpaired.join(", ")));
    }

    let score = if ratios.is_empty() {
        NEUTRAL_CAPACITY
    } else {
        ratios.iter().map(|(_, r)| r).sum::<f64>() / ratios.len() as f64
    };
    (score, reason)
}

/// Spread: 1 − share of existing placements in the candidate's domain.
pub fn spread_score(location: &Location, ctx: &SpreadContext) -> (f64, String) {
    let Some(domain) = location.topology_domain() else {
        return (
            NEUTRAL_SPREAD,
            "spread: no zone or region, neutral".to_string(),
        );
    };
    if ctx.is_empty() {
        return (
            NEUTRAL_SPREAD,
            "spread: no existing placements, neutral".to_string(),
        );
    }

    let occupied = ctx.occupancy(domain);
    let score = 1.0 - occupied as f64 / ctx.total() as f64;
    (
        score,
        format!(
            "spread: {occupied}/{} existing placements in {domain}",
            ctx.total()
        ),
    )
}

/// Latency: neutral until measurements exist.
pub fn latency_score(_location: &Location) -> (f64, String) {
    (
        NEUTRAL_LATENCY,
        "latency: no measurements, neutral".to_string(),
    )
}

/// Weighted combination of criterion scores, clamped to `0.0..=1.0`.
///
/// Weights are divided by the largest one first, so only their ratios
/// matter and the sum cannot overflow. A non-finite sub-score counts as
/// the criterion's neutral value.
pub fn combine(scores: &CriterionScores, weights: &ScoringWeights) -> f64 {
    let score = |c: Criterion| {
        let value = scores.get(c);
        if value.is_finite() { value } else { c.neutral() }
    };
    let max_weight = Criterion::ALL
        .into_iter()
        .map(|c| weights.get(c))
        .fold(0.0_f64, f64::max);

    let total = if max_weight > 0.0 {
        let (weighted, weight_sum) = Criterion::ALL
            .into_iter()
            .map(|c| (c, weights.get(c) / max_weight))
            .filter(|(_, w)| *w > 0.0)
            .fold((0.0, 0.0), |(sum, ws), (c, w)| (sum + score(c) * w, ws + w));
        weighted / weight_sum
    } else {
        Criterion::ALL.into_iter().map(score).sum::<f64>() / Criterion::ALL.len() as f64
    };
    if total.is_finite() {
        total.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Score a single location for the given spec.
pub fn score_candidate(
    location: &Location,
    spec: &PlacementSpec,
    weights: &ScoringWeights,
    spread: &SpreadContext,
) -> CandidateScore {
    let (affinity, affinity_reason) = affinity_score(location, spec);
    let (capacity, capacity_reason) = capacity_score(location);
    let (spread, spread_reason) = spread_score(location, spread);
    let (latency, latency_reason) = latency_score(location);

    let breakdown = CriterionScores {
        affinity,
        capacity,
        spread,
        latency,
    };
    let total = combine(&breakdown, weights);
    let unweighted = weights.active_total() <= 0.0;

    let reasons = [
        (Criterion::Affinity, affinity_reason),
        (Criterion::Capacity, capacity_reason),
        (Criterion::Spread, spread_reason),
        (Criterion::Latency, latency_reason),
    ]
    .into_iter()
    .map(|(criterion, text)| {
        let weight = weights.get(criterion);
        let value = breakdown.get(criterion);
        if unweighted {
            format!("{text} ({value:.2}, unweighted)")
        } else if weight > 0.0 {
            format!("{text} ({value:.2} × {weight:.2})")
        } else {
            format!("{text} ({value:.2}, excluded)")
        }
    })
    .collect();

    CandidateScore {
        total,
        breakdown,
        reasons,
    }
}

/// Ranking order: higher score first, then cluster name ascending.
pub fn rank_order(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.location.name.cmp(&b.location.name))
}

/// Score all locations and return them ranked (best first).
pub fn rank_candidates(
    locations: &[&Location],
    spec: &PlacementSpec,
    weights: &ScoringWeights,
    spread: &SpreadContext,
) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = locations
        .iter()
        .map(|&loc| Candidate::new(loc.clone(), score_candidate(loc, spec, weights, spread)))
        .collect();
    candidates.sort_by(rank_order);
    candidates
}

/// Parse a resource quantity such as `8`, `500m`, `1.5k`, `16Gi`.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    const SUFFIXES: [(&str, f64); 13] = [
        ("Ki", 1024.0),
        ("Mi", 1_048_576.0),
        ("Gi", 1_073_741_824.0),
        ("Ti", 1_099_511_627_776.0),
        ("Pi", 1_125_899_906_842_624.0),
        ("Ei", 1_152_921_504_606_846_976.0),
        ("m", 1e-3),
        ("k", 1e3),
        ("M", 1e6),
        ("G", 1e9),
        ("T", 1e12),
        ("P", 1e15),
        ("E", 1e18),
    ];

    let raw = raw.trim();
    let (number, multiplier) = SUFFIXES
        .iter()
        .find_map(|(suffix, mult)| raw.strip_suffix(suffix).map(|n| (n, *mult)))
        .unwrap_or((raw, 1.0));

    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let quantity = value * multiplier;
    quantity.is_finite().then_some(quantity)
}
