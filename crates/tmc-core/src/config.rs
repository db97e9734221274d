//! tmc.toml engine configuration parser.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TmcConfig {
    pub scoring: Option<ScoringConfig>,
    pub selection: Option<SelectionConfig>,
}

/// Default scoring weights applied when a policy carries none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Weight name → weight. Validated by the placement engine, so an
    /// unknown key is reported rather than dropped.
    pub weights: Option<HashMap<String, f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Strategy used when a policy names none.
    pub default_strategy: Option<String>,
}

impl TmcConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: TmcConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a tmc.toml spelling out the built-in defaults.
    pub fn scaffold() -> Self {
        let weights = HashMap::from([
            ("affinity".to_string(), 0.4),
            ("capacity".to_string(), 0.3),
            ("spread".to_string(), 0.2),
            ("latency".to_string(), 0.1),
        ]);
        TmcConfig {
            scoring: Some(ScoringConfig {
                weights: Some(weights),
            }),
            selection: Some(SelectionConfig {
                default_strategy: Some("ScoreBased".to_string()),
            }),
        }
    }

    pub fn weights(&self) -> Option<&HashMap<String, f64>> {
        self.scoring.as_ref().and_then(|s| s.weights.as_ref())
    }

    pub fn default_strategy(&self) -> Option<&str> {
        self.selection
            .as_ref()
            .and_then(|s| s.default_strategy.as_deref())
    }
}
