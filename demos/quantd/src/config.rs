use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use qk_engine::EngineConfig;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub scoring: ScoringSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub symbols: Vec<String>,
    pub interval: String,
    pub history_limit: usize,
    pub refresh_secs: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        let defaults = EngineConfig::default();
        Self {
            symbols: defaults.symbols,
            interval: defaults.interval,
            history_limit: defaults.history_limit,
            refresh_secs: defaults.refresh_secs,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ScoringSection {
    /// Optional YAML file overriding the factor weights
    pub weights_file: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            symbols: self.engine.symbols.clone(),
            interval: self.engine.interval.clone(),
            history_limit: self.engine.history_limit,
            refresh_secs: self.engine.refresh_secs,
        }
    }
}
