use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(&'static str),
}

/// Escrow-wide limits applied on top of each program's own terms
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscrowConfig {
    /// Floor for every commitment bond, whatever the program asks
    pub min_bond: u128,
    pub max_open_claims_per_program: usize,
    pub min_claim_window: u64,
    pub min_reveal_window: u64,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            min_bond: 1,
            max_open_claims_per_program: 64,
            min_claim_window: 1,
            min_reveal_window: 1,
        }
    }
}

impl EscrowConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_open_claims_per_program == 0 {
            return Err(ConfigError::Invalid("max_open_claims_per_program must be positive"));
        }
        if self.min_claim_window == 0 || self.min_reveal_window == 0 {
            return Err(ConfigError::Invalid("windows must be at least one second"));
        }
        Ok(())
    }
}
