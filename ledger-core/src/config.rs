//! Configuration for the ledger

use crate::crypto::HashAlgorithm;
use serde::{Deserialize, Serialize};

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ledger name
    pub name: String,

    /// Ledger description
    pub description: String,

    /// Seed mixed into every block hash as the first Merkle leaf
    pub seed: String,

    /// Address of the genesis account
    pub master_address: String,

    /// Fixed total value held by the master account at genesis
    pub max_balance: u64,

    /// Hash algorithm name (`SHA-256` or `BLAKE3`)
    pub hash_algorithm: String,

    /// Actor configuration
    pub actor: ActorConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "ledger".to_string(),
            description: String::new(),
            seed: "seed".to_string(),
            master_address: "master".to_string(),
            max_balance: i32::MAX as u64, // 2_147_483_647
            hash_algorithm: HashAlgorithm::Sha256.name().to_string(),
            actor: ActorConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

/// Actor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Bounded mailbox size
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable prometheus collection
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Config with the three ledger identity fields set
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        seed: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            seed: seed.into(),
            ..Default::default()
        }
    }

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

        if let Ok(name) = std::env::var("LEDGER_NAME") {
            config.name = name;
        }

        if let Ok(description) = std::env::var("LEDGER_DESCRIPTION") {
            config.description = description;
        }

        if let Ok(seed) = std::env::var("LEDGER_SEED") {
            config.seed = seed;
        }

        if let Ok(algorithm) = std::env::var("LEDGER_HASH_ALGORITHM") {
            config.hash_algorithm = algorithm;
        }

        if let Ok(max) = std::env::var("LEDGER_MAX_BALANCE") {
            config.max_balance = max.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid LEDGER_MAX_BALANCE {:?}: {}", max, e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_balance == 0 {
            return Err(crate::Error::Config("max_balance must be positive".to_string()));
        }

        if self.master_address.is_empty() {
            return Err(crate::Error::Config(
                "master_address must not be empty".to_string(),
            ));
        }

        if self.actor.mailbox_capacity == 0 {
            return Err(crate::Error::Config(
                "actor.mailbox_capacity must be positive".to_string(),
            ));
        }

        self.algorithm().map(|_| ())
    }

    /// Resolve the configured hash algorithm
    pub fn algorithm(&self) -> crate::Result<HashAlgorithm> {
        HashAlgorithm::from_name(&self.hash_algorithm)
    }
}
