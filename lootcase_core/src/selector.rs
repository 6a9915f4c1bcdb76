use crate::{
    catalog::{Case, ItemTemplate},
    error::{LootError, LootResult},
    odds::RarityTable,
    rarity::Rarity,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Share of a case's total weight held by one rarity tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RarityOdds {
    pub rarity: Rarity,
    pub weight: u64,
    pub probability: f64,
}

fn cumulative_weights(case: &Case, table: &RarityTable) -> Vec<u64> {
    case.skins
        .iter()
        .scan(0u64, |acc, item| {
            *acc += u64::from(table.weight(item.rarity));
            Some(*acc)
        })
        .collect()
}

/// Draws one item with probability `weight(rarity) / total weight of the case`.
///
/// Uses a single uniform integer in `[0, total)` located among the cumulative
/// weights, so the expanded pool is never materialized.
pub fn draw_item<'c, R: Rng + ?Sized>(
    case: &'c Case,
    table: &RarityTable,
    rng: &mut R,
) -> LootResult<&'c ItemTemplate> {
    let cumulative = cumulative_weights(case, table);
    let total = match cumulative.last() {
        Some(&total) if total > 0 => total,
        _ => return Err(LootError::EmptyCase { case_id: case.id }),
    };
    let roll = rng.gen_range(0..total);
    let index = cumulative.partition_point(|&bound| bound <= roll);
    let item = case
        .skins
        .get(index)
        .ok_or(LootError::EmptyCase { case_id: case.id })?;
    debug!(case_id = case.id, roll, total, item = %item.name, "drew item");
    Ok(item)
}

/// Per-rarity drop probabilities for the tiers present in the case, lowest tier first.
pub fn drop_odds(case: &Case, table: &RarityTable) -> Vec<RarityOdds> {
    let total: u64 = case
        .skins
        .iter()
        .map(|item| u64::from(table.weight(item.rarity)))
        .sum();
    if total == 0 {
        return Vec::new();
    }
    Rarity::ALL
        .iter()
        .filter_map(|&rarity| {
            let weight: u64 = case
                .skins
                .iter()
                .filter(|item| item.rarity == rarity)
                .map(|item| u64::from(table.weight(item.rarity)))
                .sum();
            (weight > 0).then(|| RarityOdds {
                rarity,
                weight,
                probability: weight as f64 / total as f64,
            })
        })
        .collect()
}
