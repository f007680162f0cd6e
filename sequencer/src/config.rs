use escrow::{ConfigError, EscrowConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    pub escrow: EscrowConfig,
    /// Commands waiting to be sequenced before submitters back off
    pub queue_capacity: usize,
    /// Events a slow subscriber may lag behind before it starts missing them
    pub event_buffer: usize,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            escrow: EscrowConfig::default(),
            queue_capacity: 1024,
            event_buffer: 4096,
        }
    }
}

impl SequencerConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be positive"));
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::Invalid("event_buffer must be positive"));
        }
        self.escrow.validate()
    }
}
