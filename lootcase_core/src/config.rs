use crate::{money::Money, odds::RarityTable, rarity::Rarity};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_STARTING_BALANCE: Money = Money::from_cents(50_000);
pub const DEFAULT_UPGRADE_MULTIPLIER_PERCENT: u32 = 250;
pub const DEFAULT_MAX_FAILURE_LOSSES: usize = 3;

/// Tunable economy constants. Every field defaults to the reference value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EconomyConfig {
    pub starting_balance: Money,
    /// Price factor applied to a promoted item, in percent (250 = 2.5x).
    pub upgrade_multiplier_percent: u32,
    /// Items lost at most when an upgrade fails.
    pub max_failure_losses: usize,
    pub rarity: RarityTable,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_balance: DEFAULT_STARTING_BALANCE,
            upgrade_multiplier_percent: DEFAULT_UPGRADE_MULTIPLIER_PERCENT,
            max_failure_losses: DEFAULT_MAX_FAILURE_LOSSES,
            rarity: RarityTable::reference(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("draw weight for {0} must be at least 1")]
    ZeroWeight(Rarity),
    #[error("upgrade chance for {0} must be within 1..=100, got {1}")]
    ChanceOutOfRange(Rarity, u8),
    #[error("default draw weight must be at least 1")]
    ZeroDefaultWeight,
    #[error("default upgrade chance must be within 1..=100, got {0}")]
    DefaultChanceOutOfRange(u8),
    #[error("upgrade multiplier must be at least 100%, got {0}%")]
    MultiplierTooSmall(u32),
    #[error("an upgrade failure must cost at least one item")]
    NoFailureLoss,
}

impl EconomyConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EconomyConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some((&rarity, _)) = self.rarity.weights.iter().find(|(_, &w)| w == 0) {
            return Err(ConfigError::ZeroWeight(rarity));
        }
        if let Some((&rarity, &chance)) = self
            .rarity
            .chances
            .iter()
            .find(|(_, &c)| !(1..=100).contains(&c))
        {
            return Err(ConfigError::ChanceOutOfRange(rarity, chance));
        }
        if self.rarity.default_weight == 0 {
            return Err(ConfigError::ZeroDefaultWeight);
        }
        if !(1..=100).contains(&self.rarity.default_chance) {
            return Err(ConfigError::DefaultChanceOutOfRange(self.rarity.default_chance));
        }
        if self.upgrade_multiplier_percent < 100 {
            return Err(ConfigError::MultiplierTooSmall(self.upgrade_multiplier_percent));
        }
        if self.max_failure_losses == 0 {
            return Err(ConfigError::NoFailureLoss);
        }
        Ok(())
    }
}
