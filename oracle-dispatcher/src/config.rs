//! Oracle fleet configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use surety_core::FlightStatus;

/// Fleet configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Oracles registered at bootstrap
    pub oracle_count: usize,

    /// Status codes an oracle may hold as its opinion
    pub status_codes: Vec<u8>,

    /// Seed for opinion assignment; random when unset
    pub rng_seed: Option<u64>,

    /// Oracle addresses are `{address_prefix}-{n}`
    pub address_prefix: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            oracle_count: 20,
            status_codes: FlightStatus::ALL.iter().map(FlightStatus::code).collect(),
            rng_seed: None,
            address_prefix: "oracle".to_string(),
        }
    }
}

impl DispatcherConfig {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DispatcherConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = DispatcherConfig::default();

        if let Ok(count) = std::env::var("DISPATCHER_ORACLE_COUNT") {
            config.oracle_count = count
                .parse()
                .map_err(|e| Error::Config(format!("DISPATCHER_ORACLE_COUNT: {}", e)))?;
        }

        if let Ok(seed) = std::env::var("DISPATCHER_RNG_SEED") {
            let seed = seed
                .parse()
                .map_err(|e| Error::Config(format!("DISPATCHER_RNG_SEED: {}", e)))?;
            config.rng_seed = Some(seed);
        }

        config.validate()?;
        Ok(config)
    }

    /// Opinions the fleet may draw from
    pub fn statuses(&self) -> Vec<FlightStatus> {
        self.status_codes
            .iter()
            .filter_map(|&code| FlightStatus::from_code(code))
            .collect()
    }

    /// Check constraints
    pub fn validate(&self) -> Result<()> {
        if self.status_codes.is_empty() {
            return Err(Error::Config("status_codes must not be empty".into()));
        }
        if let Some(code) = self
            .status_codes
            .iter()
            .find(|&&code| FlightStatus::from_code(code).is_none())
        {
            return Err(Error::Config(format!("unknown status code {}", code)));
        }
        if self.address_prefix.is_empty() {
            return Err(Error::Config("address_prefix must not be empty".into()));
        }
        Ok(())
    }
}
