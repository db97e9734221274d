//! Selection strategies — score-based, balanced, packed, spread.
//!
//! Every strategy works over the same ranked candidate list and returns at
//! most `number_of_clusters` candidates (all of them when the count is zero,
//! negative or larger than the list). Results are in pick order.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::scorer::rank_order;
use crate::types::Candidate;

/// How ranked candidates become the final target set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementStrategy {
    /// Top N by score. Default.
    #[default]
    ScoreBased,
    /// Round-robin across zones, best candidate per zone per round.
    Balanced,
    /// Fill the zones already in use before opening another one.
    Packed,
    /// One per region, then one per zone, then round-robin.
    Spread,
}

impl PlacementStrategy {
    /// Parse a strategy name, case-insensitively. Returns `None` for
    /// unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "scorebased" => Some(Self::ScoreBased),
            "balanced" => Some(Self::Balanced),
            "packed" => Some(Self::Packed),
            "spread" => Some(Self::Spread),
            _ => None,
        }
    }

    /// Parse a strategy name, falling back to `fallback` when the name is
    /// missing, and to [`PlacementStrategy::ScoreBased`] when it is unknown.
    pub fn parse_or(name: Option<&str>, fallback: Self) -> Self {
        match name.map(str::trim) {
            None | Some("") => fallback,
            Some(name) => Self::from_name(name).unwrap_or_else(|| {
                warn!(strategy = name, "unknown placement strategy, using ScoreBased");
                Self::ScoreBased
            }),
        }
    }
}

impl fmt::Display for PlacementStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ScoreBased => "ScoreBased",
            Self::Balanced => "Balanced",
            Self::Packed => "Packed",
            Self::Spread => "Spread",
        };
        f.write_str(s)
    }
}

/// Number of clusters to pick out of `available`.
pub fn target_count(number_of_clusters: i32, available: usize) -> usize {
    if number_of_clusters <= 0 {
        available
    } else {
        (number_of_clusters as usize).min(available)
    }
}

/// Choose the final target set from scored candidates.
pub fn select<'a>(
    candidates: &'a [Candidate],
    strategy: PlacementStrategy,
    number_of_clusters: i32,
) -> Vec<&'a Candidate> {
    let mut ranked: Vec<&Candidate> = candidates.iter().collect();
    ranked.sort_by(|a, b| rank_order(a, b));

    let count = target_count(number_of_clusters, ranked.len());
    if count == 0 {
        return Vec::new();
    }

    match strategy {
        PlacementStrategy::ScoreBased => ranked.into_iter().take(count).collect(),
        PlacementStrategy::Balanced => select_balanced(&ranked, count),
        PlacementStrategy::Packed => select_packed(&ranked, count),
        PlacementStrategy::Spread => select_spread(&ranked, count),
    }
}

/// Candidates sharing a topology domain, best first.
struct Domain<'a> {
    name: String,
    members: VecDeque<&'a Candidate>,
    picked: usize,
}

/// Group ranked candidates by `key`. Domains are ordered by the score of
/// their best candidate, then by domain name.
fn group_by<'a>(
    ranked: &[&'a Candidate],
    key: impl Fn(&Candidate) -> String,
) -> Vec<Domain<'a>> {
    let mut groups: BTreeMap<String, VecDeque<&'a Candidate>> = BTreeMap::new();
    for &candidate in ranked {
        groups.entry(key(candidate)).or_default().push_back(candidate);
    }

    let mut domains: Vec<Domain<'a>> = groups
        .into_iter()
        .map(|(name, members)| Domain {
            name,
            members,
            picked: 0,
        })
        .collect();
    domains.sort_by(|a, b| {
        let a_best = a.members.front().map_or(f64::NEG_INFINITY, |c| c.score);
        let b_best = b.members.front().map_or(f64::NEG_INFINITY, |c| c.score);
        b_best.total_cmp(&a_best).then_with(|| a.name.cmp(&b.name))
    });
    domains
}

fn zone_key(candidate: &Candidate) -> String {
    candidate
        .location
        .topology_domain()
        .unwrap_or_default()
        .to_string()
}

fn region_key(candidate: &Candidate) -> String {
    candidate.location.region.clone().unwrap_or_default()
}

fn select_balanced<'a>(ranked: &[&'a Candidate], count: usize) -> Vec<&'a Candidate> {
    let mut domains = group_by(ranked, zone_key);
    let mut picked = Vec::with_capacity(count);

    while picked.len() < count {
        let before = picked.len();
        for domain in domains.iter_mut() {
            if picked.len() == count {
                break;
            }
            if let Some(candidate) = domain.members.pop_front() {
                picked.push(candidate);
            }
        }
        if picked.len() == before {
            break;
        }
    }
    picked
}

fn select_packed<'a>(ranked: &[&'a Candidate], count: usize) -> Vec<&'a Candidate> {
    let mut domains = group_by(ranked, zone_key);
    let mut picked = Vec::with_capacity(count);
    let mut opened = 0;

    while picked.len() < count {
        // Best remaining candidate among opened domains.
        let best = domains[..opened]
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.members.front().map(|c| (i, *c)))
            .min_by(|(_, a), (_, b)| rank_order(a, b))
            .map(|(i, _)| i);

        let index = match best {
            Some(i) => i,
            None if opened < domains.len() => {
                opened += 1;
                opened - 1
            }
            None => break,
        };

        if let Some(candidate) = domains[index].members.pop_front() {
            picked.push(candidate);
        }
    }
    picked
}

fn select_spread<'a>(ranked: &[&'a Candidate], count: usize) -> Vec<&'a Candidate> {
    let mut picked: Vec<&'a Candidate> = Vec::with_capacity(count);
    let mut taken: HashSet<&str> = HashSet::new();

    // One per region.
    for region in group_by(ranked, region_key) {
        if picked.len() == count {
            return picked;
        }
        if let Some(&best) = region.members.front() {
            taken.insert(best.name());
            picked.push(best);
        }
    }

    let mut zones = group_by(ranked, zone_key);
    for zone in zones.iter_mut() {
        zone.members.retain(|c| !taken.contains(c.name()));
        zone.picked = picked.iter().filter(|c| zone_key(c) == zone.name).count();
    }

    // One per zone not yet represented.
    for zone in zones.iter_mut().filter(|z| z.picked == 0) {
        if picked.len() == count {
            return picked;
        }
        if let Some(candidate) = zone.members.pop_front() {
            zone.picked += 1;
            picked.push(candidate);
        }
    }

    // Round-robin, least-picked zone first.
    while picked.len() < count {
        let next = zones
            .iter()
            .enumerate()
            .filter_map(|(i, z)| z.members.front().map(|c| (i, z.picked, *c)))
            .min_by(|(_, a_picked, a), (_, b_picked, b)| {
                a_picked.cmp(b_picked).then_with(|| rank_order(a, b))
            })
            .map(|(i, _, _)| i);

        let Some(index) = next else { break };
        if let Some(candidate) = zones[index].members.pop_front() {
            zones[index].picked += 1;
            picked.push(candidate);
        }
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::CriterionScores;
    use crate::types::Location;

    fn make_candidate(
        name: &str,
        zone: Option<&str>,
        region: Option<&str>,
        score: f64,
    ) -> Candidate {
        let mut location = Location::new(name);
        location.zone = zone.map(str::to_string);
        location.region = region.map(str::to_string);
        Candidate {
            location,
            score,
            breakdown: CriterionScores {
                affinity: score,
                capacity: score,
                spread: score,
                latency: score,
            },
            reasons: Vec::new(),
        }
    }

    fn names(picked: &[&Candidate]) -> Vec<String> {
        picked.iter().map(|c| c.name().to_string()).collect()
    }

    fn zoned(specs: &[(&str, &str, f64)]) -> Vec<Candidate> {
        specs
            .iter()
            .map(|(name, zone, score)| make_candidate(name, Some(zone), None, *score))
            .collect()
    }

    #[test]
    fn parses_strategy_names() {
        assert_eq!(PlacementStrategy::from_name("ScoreBased"), Some(PlacementStrategy::ScoreBased));
        assert_eq!(
            PlacementStrategy::from_name("score-based"),
            Some(PlacementStrategy::ScoreBased)
        );
        assert_eq!(PlacementStrategy::from_name("BALANCED"), Some(PlacementStrategy::Balanced));
        assert_eq!(PlacementStrategy::from_name("packed"), Some(PlacementStrategy::Packed));
        assert_eq!(PlacementStrategy::from_name("Spread"), Some(PlacementStrategy::Spread));
        assert_eq!(PlacementStrategy::from_name("Spraed"), None);
    }

    #[test]
    fn unknown_strategy_falls_back_to_score_based() {
        assert_eq!(
            PlacementStrategy::parse_or(Some("Spraed"), PlacementStrategy::Packed),
            PlacementStrategy::ScoreBased
        );
        assert_eq!(
            PlacementStrategy::parse_or(None, PlacementStrategy::Packed),
            PlacementStrategy::Packed
        );
        assert_eq!(
            PlacementStrategy::parse_or(Some("  "), PlacementStrategy::Spread),
            PlacementStrategy::Spread
        );
    }

    #[test]
    fn target_count_edges() {
        assert_eq!(target_count(0, 5), 5);
        assert_eq!(target_count(-3, 5), 5);
        assert_eq!(target_count(10, 3), 3);
        assert_eq!(target_count(2, 3), 2);
        assert_eq!(target_count(2, 0), 0);
    }

    #[test]
    fn empty_input_selects_nothing() {
        for strategy in [
            PlacementStrategy::ScoreBased,
            PlacementStrategy::Balanced,
            PlacementStrategy::Packed,
            PlacementStrategy::Spread,
        ] {
            assert!(select(&[], strategy, 3).is_empty());
        }
    }

    #[test]
    fn score_based_takes_top_n() {
        let candidates = zoned(&[("c1", "a", 0.2), ("c2", "a", 0.9), ("c3", "b", 0.5)]);
        let picked = select(&candidates, PlacementStrategy::ScoreBased, 2);
        assert_eq!(names(&picked), vec!["c2", "c3"]);
    }

    #[test]
    fn ties_break_by_name() {
        let candidates = zoned(&[("zeta", "a", 0.5), ("alpha", "a", 0.5), ("mid", "a", 0.5)]);
        let picked = select(&candidates, PlacementStrategy::ScoreBased, 0);
        assert_eq!(names(&picked), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn balanced_round_robins_zones() {
        let candidates = zoned(&[
            ("a1", "a", 0.9),
            ("a2", "a", 0.8),
            ("b1", "b", 0.5),
            ("b2", "b", 0.4),
            ("c1", "c", 0.1),
        ]);
        let picked = select(&candidates, PlacementStrategy::Balanced, 4);
        assert_eq!(names(&picked), vec!["a1", "b1", "c1", "a2"]);
    }

    #[test]
    fn balanced_tied_scores_cover_every_zone() {
        let candidates = zoned(&[
            ("a1", "a", 0.5),
            ("a2", "a", 0.5),
            ("b1", "b", 0.5),
            ("b2", "b", 0.5),
            ("c1", "c", 0.5),
        ]);
        let picked = select(&candidates, PlacementStrategy::Balanced, 3);
        assert_eq!(names(&picked), vec!["a1", "b1", "c1"]);
    }

    #[test]
    fn packed_fills_zone_before_opening_another() {
        let candidates = zoned(&[
            ("a1", "a", 0.9),
            ("a2", "a", 0.3),
            ("b1", "b", 0.8),
            ("b2", "b", 0.7),
        ]);
        let picked = select(&candidates, PlacementStrategy::Packed, 3);
        assert_eq!(names(&picked), vec!["a1", "a2", "b1"]);
    }

    #[test]
    fn packed_single_pick_is_best_overall() {
        let candidates = zoned(&[("a1", "a", 0.2), ("b1", "b", 0.8)]);
        let picked = select(&candidates, PlacementStrategy::Packed, 1);
        assert_eq!(names(&picked), vec!["b1"]);
    }

    #[test]
    fn spread_covers_regions_then_zones() {
        let candidates = vec![
            make_candidate("e1", Some("east-a"), Some("east"), 0.9),
            make_candidate("e2", Some("east-b"), Some("east"), 0.8),
            make_candidate("e3", Some("east-a"), Some("east"), 0.7),
            make_candidate("w1", Some("west-a"), Some("west"), 0.2),
        ];
        let picked = select(&candidates, PlacementStrategy::Spread, 4);
        assert_eq!(names(&picked), vec!["e1", "w1", "e2", "e3"]);
    }

    #[test]
    fn spread_single_zone_matches_score_based() {
        let candidates = zoned(&[
            ("c1", "a", 0.1),
            ("c2", "a", 0.9),
            ("c3", "a", 0.5),
            ("c4", "a", 0.7),
            ("c5", "a", 0.3),
        ]);
        let spread = select(&candidates, PlacementStrategy::Spread, 3);
        let score_based = select(&candidates, PlacementStrategy::ScoreBased, 3);
        assert_eq!(names(&spread), names(&score_based));
        assert_eq!(names(&spread), vec!["c2", "c4", "c3"]);
    }

    #[test]
    fn zoneless_candidates_share_one_domain() {
        let candidates = vec![
            make_candidate("x1", None, None, 0.9),
            make_candidate("x2", None, None, 0.8),
            make_candidate("a1", Some("a"), None, 0.1),
        ];
        let picked = select(&candidates, PlacementStrategy::Balanced, 2);
        assert_eq!(names(&picked), vec!["x1", "a1"]);
    }

    #[test]
    fn every_strategy_respects_count_and_subset() {
        let candidates = zoned(&[
            ("a1", "a", 0.9),
            ("a2", "a", 0.6),
            ("b1", "b", 0.4),
            ("c1", "c", 0.3),
            ("c2", "c", 0.2),
        ]);
        for strategy in [
            PlacementStrategy::ScoreBased,
            PlacementStrategy::Balanced,
            PlacementStrategy::Packed,
            PlacementStrategy::Spread,
        ] {
            for n in -1..=7 {
                let picked = select(&candidates, strategy, n);
                assert_eq!(picked.len(), target_count(n, candidates.len()), "{strategy} n={n}");

                let mut unique: Vec<&str> = picked.iter().map(|c| c.name()).collect();
                unique.sort();
                unique.dedup();
                assert_eq!(unique.len(), picked.len(), "{strategy} picked a duplicate");
                assert!(picked
                    .iter()
                    .all(|p| candidates.iter().any(|c| c.name() == p.name())));
            }
        }
    }
}
