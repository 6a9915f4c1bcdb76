use crate::rarity::Rarity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_DRAW_WEIGHT: u32 = 100;
pub const DEFAULT_BASE_CHANCE: u8 = 50;

/// Per-tier draw weights and upgrade base chances.
///
/// Tiers missing from either map fall back to the table defaults, so a
/// partial configuration file only needs to list what it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RarityTable {
    pub weights: BTreeMap<Rarity, u32>,
    pub chances: BTreeMap<Rarity, u8>,
    pub default_weight: u32,
    pub default_chance: u8,
}

impl RarityTable {
    pub fn reference() -> Self {
        let weights = [
            (Rarity::ConsumerGrade, 6000),
            (Rarity::IndustrialGrade, 2500),
            (Rarity::MilSpec, 1000),
            (Rarity::Restricted, 400),
            (Rarity::Classified, 90),
            (Rarity::Covert, 10),
            (Rarity::RareSpecial, 1),
        ];
        let chances = [
            (Rarity::ConsumerGrade, 80),
            (Rarity::IndustrialGrade, 65),
            (Rarity::MilSpec, 50),
            (Rarity::Restricted, 35),
            (Rarity::Classified, 20),
            (Rarity::Covert, 10),
            (Rarity::RareSpecial, 5),
        ];
        Self {
            weights: weights.into_iter().collect(),
            chances: chances.into_iter().collect(),
            default_weight: DEFAULT_DRAW_WEIGHT,
            default_chance: DEFAULT_BASE_CHANCE,
        }
    }

    pub fn weight(&self, rarity: Rarity) -> u32 {
        self.weights.get(&rarity).copied().unwrap_or(self.default_weight)
    }

    /// Upgrade success chance in percent for a single item of this tier.
    pub fn base_chance(&self, rarity: Rarity) -> u8 {
        self.chances.get(&rarity).copied().unwrap_or(self.default_chance)
    }
}

impl Default for RarityTable {
    fn default() -> Self {
        Self::reference()
    }
}
