//! Configuration for the surety ledger

use crate::types::{Address, Amount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Surety configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Airline governance configuration
    pub governance: GovernanceConfig,

    /// Insurance configuration
    pub insurance: InsuranceConfig,

    /// Oracle configuration
    pub oracle: OracleConfig,

    /// Actor configuration
    pub actor: ActorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "surety-core".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            governance: GovernanceConfig::default(),
            insurance: InsuranceConfig::default(),
            oracle: OracleConfig::default(),
            actor: ActorConfig::default(),
        }
    }
}

/// Airline governance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Dues an airline pays to become Paid
    pub airline_dues: Amount,

    /// Paid-airline count up to which a single approval registers a candidate
    pub consensus_threshold: usize,

    /// Founding airline, Paid at genesis (also the contract owner)
    pub founding_airline: Address,

    /// Founding airline display name
    pub founding_airline_name: String,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            airline_dues: Decimal::from(10),
            consensus_threshold: 4,
            founding_airline: Address::new("airline-0"),
            founding_airline_name: "Founding Airline".to_string(),
        }
    }
}

/// Insurance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsuranceConfig {
    /// Maximum premium per policy
    pub max_premium: Amount,

    /// Payout = premium * multiplier
    pub payout_multiplier: Decimal,
}

impl Default for InsuranceConfig {
    fn default() -> Self {
        Self {
            max_premium: Decimal::ONE,
            payout_multiplier: Decimal::new(15, 1), // 1.5x
        }
    }
}

/// Oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Fee an oracle pays to register
    pub registration_fee: Amount,

    /// Shard indexes are drawn from `0..index_space`
    pub index_space: u8,

    /// Indexes assigned per oracle
    pub indexes_per_oracle: usize,

    /// Matching votes needed to finalize a status
    pub quorum: usize,

    /// Seed for index assignment (None = OS entropy)
    pub rng_seed: Option<u64>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            registration_fee: Decimal::ONE,
            index_space: 10,
            indexes_per_oracle: 3,
            quorum: 3,
            rng_seed: None,
        }
    }
}

/// Actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Bounded mailbox size (backpressure)
    pub mailbox_capacity: usize,

    /// Event broadcast buffer per subscriber
    pub event_channel_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
            event_channel_capacity: 1024,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(seed) = std::env::var("SURETY_RNG_SEED") {
            let seed = seed
                .parse()
                .map_err(|e| crate::Error::Config(format!("SURETY_RNG_SEED: {}", e)))?;
            config.oracle.rng_seed = Some(seed);
        }

        if let Ok(quorum) = std::env::var("SURETY_QUORUM") {
            config.oracle.quorum = quorum
                .parse()
                .map_err(|e| crate::Error::Config(format!("SURETY_QUORUM: {}", e)))?;
        }

        if let Ok(max_premium) = std::env::var("SURETY_MAX_PREMIUM") {
            config.insurance.max_premium = max_premium
                .parse()
                .map_err(|e| crate::Error::Config(format!("SURETY_MAX_PREMIUM: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> crate::Result<()> {
        if self.oracle.index_space == 0 {
            return Err(crate::Error::Config("oracle.index_space must be > 0".into()));
        }
        if self.oracle.indexes_per_oracle == 0 {
            return Err(crate::Error::Config(
                "oracle.indexes_per_oracle must be > 0".into(),
            ));
        }
        if self.oracle.quorum == 0 {
            return Err(crate::Error::Config("oracle.quorum must be > 0".into()));
        }
        if self.insurance.payout_multiplier <= Decimal::ZERO {
            return Err(crate::Error::Config(
                "insurance.payout_multiplier must be positive".into(),
            ));
        }
        if self.actor.mailbox_capacity == 0 || self.actor.event_channel_capacity == 0 {
            return Err(crate::Error::Config("actor capacities must be > 0".into()));
        }
        Ok(())
    }
}
