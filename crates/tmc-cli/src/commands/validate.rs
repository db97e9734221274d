use std::path::Path;

use tmc_core::{PlacementPolicy, TmcConfig};
use tmc_placement::{PlacementStrategy, policy_to_spec};

use super::decide::read_json;

pub fn validate(policy_path: &str) -> anyhow::Result<()> {
    let policy: PlacementPolicy = read_json(policy_path)?;
    let summary = check(&policy)?;
    println!("✓ {policy_path}: {summary}");
    Ok(())
}

/// Validate a policy and summarize what it asks for.
pub fn check(policy: &PlacementPolicy) -> anyhow::Result<String> {
    let spec = policy_to_spec(policy, PlacementStrategy::ScoreBased)?;
    if let Some(name) = policy.strategy.as_deref() {
        if PlacementStrategy::from_name(name).is_none() {
            anyhow::bail!(
                "unknown strategy {name:?} (expected ScoreBased, Balanced, Packed or Spread)"
            );
        }
    }

    let count = if spec.number_of_clusters > 0 {
        spec.number_of_clusters.to_string()
    } else {
        "all".to_string()
    };
    Ok(format!(
        "{} selector terms, {} required / {} preferred affinity terms, \
         strategy {}, clusters {count}",
        spec.location_selector.expressions.len(),
        spec.required_affinity.len(),
        spec.preferred_affinity.len(),
        spec.strategy,
    ))
}

pub fn init(output: &str) -> anyhow::Result<()> {
    let path = Path::new(output);
    if path.exists() {
        anyhow::bail!("{output} already exists");
    }
    std::fs::write(path, TmcConfig::scaffold().to_toml_string()?)?;
    println!("✓ Generated {}", path.display());
    Ok(())
}
