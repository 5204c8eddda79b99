//! JSON configuration file
//!
//! Every field is optional; missing ones keep their defaults. Command-line
//! flags override whatever the file sets.

use crate::game::VerbosityLevel;
use crate::loader::DeckFormat;
use crate::simulation::SimulationConfig;
use crate::synergy::BuilderConfig;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub builder: BuilderConfig,
    /// Deck format name ("limited", "constructed", "commander")
    pub format: Option<String>,
    pub verbosity: VerbosityLevel,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()?;
        if let Some(name) = &self.format {
            DeckFormat::by_name(name)?;
        }
        Ok(())
    }

    /// The configured deck format, limited when unset
    pub fn deck_format(&self) -> Result<DeckFormat> {
        match &self.format {
            Some(name) => DeckFormat::by_name(name),
            None => Ok(DeckFormat::limited()),
        }
    }
}

/// Read and validate a config file
pub fn load_config(path: &Path) -> Result<Config> {
    let json = std::fs::read_to_string(path)?;
    Config::from_json(&json)
}
