use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use tmc_core::{ClusterInfo, PlacementPolicy, TmcConfig};
use tmc_placement::{
    PlacementDecision, PlacementEngine, clusters_to_locations, policy_to_spec,
    strategy_from_config, weights_from_config,
};
use tracing::debug;

pub fn decide(
    clusters_path: &str,
    policy_path: &str,
    config_path: Option<&str>,
    format: &str,
) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => TmcConfig::from_file(Path::new(path))
            .with_context(|| format!("reading config {path}"))?,
        None => TmcConfig::default(),
    };

    let clusters: Vec<ClusterInfo> = read_json(clusters_path)?;
    let policy: PlacementPolicy = read_json(policy_path)?;
    debug!(clusters = clusters.len(), "loaded inputs");

    let decision = run(&config, &clusters, &policy)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
        _ => {
            print!("{}", format_decision(&decision));
        }
    }

    Ok(())
}

/// Build the engine from `config` and decide `policy` over `clusters`.
pub fn run(
    config: &TmcConfig,
    clusters: &[ClusterInfo],
    policy: &PlacementPolicy,
) -> anyhow::Result<PlacementDecision> {
    let engine = PlacementEngine::new(weights_from_config(config)?);
    let spec = policy_to_spec(policy, strategy_from_config(config))?;
    let locations = clusters_to_locations(clusters);
    Ok(engine.decide(&locations, &spec)?)
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {path}"))
}

/// Human-readable rendering of a decision.
pub fn format_decision(decision: &PlacementDecision) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Strategy: {}  (considered {}, rejected {}, selected {})",
        decision.strategy,
        decision.considered_count,
        decision.rejected_count,
        decision.clusters.len()
    );

    if let Some(message) = &decision.message {
        let _ = writeln!(out, "Note: {message}");
    }

    for (i, cluster) in decision.clusters.iter().enumerate() {
        let _ = writeln!(out, "{}. {}  score {:.3}", i + 1, cluster.cluster_name, cluster.score);
        for reason in &cluster.reasons {
            let _ = writeln!(out, "     {reason}");
        }
    }

    if !decision.rejection_reasons.is_empty() {
        let _ = writeln!(out, "Rejected:");
        for (cluster, reason) in &decision.rejection_reasons {
            let _ = writeln!(out, "  {cluster}: {reason}");
        }
    }
    out
}
