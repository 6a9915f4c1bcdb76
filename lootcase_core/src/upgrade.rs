// Idle -> Selecting -> Resolving -> Resolved -> Idle (on acknowledge)

use crate::{
    config::EconomyConfig,
    error::{LootError, LootResult},
    ledger::{InventoryItem, Ledger},
    odds::RarityTable,
    rarity::Rarity,
    store::KeyValueStore,
};
use chrono::Utc;
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeOutcome {
    pub success: bool,
    /// Chance in percent the roll was compared against.
    pub chance: u8,
    pub roll: f64,
    /// The promoted item, on success.
    pub promoted: Option<InventoryItem>,
    pub previous_rarity: Option<Rarity>,
    /// Items destroyed, in selection order.
    pub items_lost: Vec<InventoryItem>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum UpgradePhase {
    #[default]
    Idle,
    Selecting,
    Resolving,
    Resolved(UpgradeOutcome),
}

/// Success chance for a selection.
///
/// A single item uses the manual override clamped to `1..=100`, or its tier's
/// base chance. Several items use the mean base chance rounded half up; the
/// override is ignored. `None` for an empty selection.
pub fn upgrade_chance(
    items: &[&InventoryItem],
    manual: Option<u8>,
    table: &RarityTable,
) -> Option<u8> {
    match items {
        [] => None,
        [item] => Some(match manual {
            Some(chance) => chance.clamp(1, 100),
            None => table.base_chance(item.rarity),
        }),
        _ => {
            let n = items.len() as u64;
            let sum: u64 = items
                .iter()
                .map(|item| u64::from(table.base_chance(item.rarity)))
                .sum();
            // round(sum / n), halves up
            Some(((2 * sum + n) / (2 * n)) as u8)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpgradeEngine {
    selection: Vec<u64>,
    manual_chance: Option<u8>,
    phase: UpgradePhase,
}

impl UpgradeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &UpgradePhase {
        &self.phase
    }

    pub fn selection(&self) -> &[u64] {
        &self.selection
    }

    pub fn manual_chance(&self) -> Option<u8> {
        self.manual_chance
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self.phase,
            UpgradePhase::Resolving | UpgradePhase::Resolved(_)
        )
    }

    fn ensure_open(&self) -> LootResult<()> {
        if self.is_busy() {
            return Err(LootError::Busy);
        }
        Ok(())
    }

    fn settle_phase(&mut self) {
        self.phase = if self.selection.is_empty() {
            UpgradePhase::Idle
        } else {
            UpgradePhase::Selecting
        };
    }

    /// Adds an item to the end of the selection. Selecting twice is a no-op.
    pub fn select<S: KeyValueStore>(&mut self, ledger: &Ledger<S>, id: u64) -> LootResult<()> {
        self.ensure_open()?;
        if ledger.item(id).is_none() {
            return Err(LootError::ItemNotFound(id));
        }
        if !self.selection.contains(&id) {
            self.selection.push(id);
        }
        self.settle_phase();
        Ok(())
    }

    /// Returns whether the id was selected.
    pub fn deselect(&mut self, id: u64) -> LootResult<bool> {
        self.ensure_open()?;
        let before = self.selection.len();
        self.selection.retain(|&selected| selected != id);
        self.settle_phase();
        Ok(self.selection.len() != before)
    }

    /// Flips the selection state of an item and returns the new state.
    pub fn toggle<S: KeyValueStore>(&mut self, ledger: &Ledger<S>, id: u64) -> LootResult<bool> {
        if self.selection.contains(&id) {
            self.deselect(id)?;
            Ok(false)
        } else {
            self.select(ledger, id)?;
            Ok(true)
        }
    }

    pub fn set_manual_chance(&mut self, chance: Option<u8>) -> LootResult<()> {
        self.ensure_open()?;
        self.manual_chance = chance;
        Ok(())
    }

    pub fn clear(&mut self) -> LootResult<()> {
        self.ensure_open()?;
        self.selection.clear();
        self.manual_chance = None;
        self.phase = UpgradePhase::Idle;
        Ok(())
    }

    fn selected_items<S: KeyValueStore>(&self, ledger: &Ledger<S>) -> LootResult<Vec<InventoryItem>> {
        self.selection
            .iter()
            .map(|&id| ledger.item(id).cloned().ok_or(LootError::ItemNotFound(id)))
            .collect()
    }

    /// Chance the current selection would be resolved with.
    pub fn chance<S: KeyValueStore>(&self, ledger: &Ledger<S>, table: &RarityTable) -> LootResult<u8> {
        let items = self.selected_items(ledger)?;
        let refs: Vec<&InventoryItem> = items.iter().collect();
        upgrade_chance(&refs, self.manual_chance, table).ok_or(LootError::EmptySelection)
    }

    /// Rolls the upgrade and applies the result to the ledger in one write.
    ///
    /// Preconditions are checked before anything is rolled: the selection is
    /// non-empty, every id is still in the inventory, and the first item is
    /// below the top tier.
    pub fn resolve<S: KeyValueStore, R: Rng + ?Sized>(
        &mut self,
        ledger: &mut Ledger<S>,
        config: &EconomyConfig,
        rng: &mut R,
    ) -> LootResult<UpgradeOutcome> {
        self.ensure_open()?;
        if self.selection.is_empty() {
            return Err(LootError::EmptySelection);
        }
        let items = self.selected_items(ledger)?;
        let target = &items[0];
        let next_rarity = target
            .rarity
            .next()
            .ok_or(LootError::AlreadyMaxRarity(target.id))?;
        let refs: Vec<&InventoryItem> = items.iter().collect();
        let chance = upgrade_chance(&refs, self.manual_chance, &config.rarity)
            .ok_or(LootError::EmptySelection)?;

        self.phase = UpgradePhase::Resolving;
        let roll: f64 = rng.gen_range(0.0..100.0);
        let success = roll < f64::from(chance);
        debug!(chance, roll, success, selected = items.len(), "upgrade roll");

        let applied = if success {
            let mut upgraded = target.template();
            upgraded.rarity = next_rarity;
            upgraded.price = target
                .price
                .scale_percent_floor(config.upgrade_multiplier_percent);
            let target_id = target.id;
            let fuel: Vec<u64> = items[1..].iter().map(|item| item.id).collect();
            let now = Utc::now();
            ledger.apply(|state| {
                let promoted = state.replace_item(target_id, &upgraded, now)?;
                let lost = fuel
                    .iter()
                    .map(|&id| state.remove_item(id))
                    .collect::<LootResult<Vec<_>>>()?;
                Ok((Some(promoted), lost))
            })
        } else {
            let doomed: HashSet<u64> = items
                .choose_multiple(rng, config.max_failure_losses)
                .map(|item| item.id)
                .collect();
            let ordered: Vec<u64> = self
                .selection
                .iter()
                .copied()
                .filter(|id| doomed.contains(id))
                .collect();
            ledger.apply(|state| {
                let lost = ordered
                    .iter()
                    .map(|&id| state.remove_item(id))
                    .collect::<LootResult<Vec<_>>>()?;
                Ok((None, lost))
            })
        };

        let (promoted, items_lost) = match applied {
            Ok(result) => result,
            Err(err) => {
                self.settle_phase();
                return Err(err);
            }
        };

        let outcome = UpgradeOutcome {
            success,
            chance,
            roll,
            previous_rarity: promoted.as_ref().map(|_| target.rarity),
            promoted,
            items_lost,
        };
        info!(
            success,
            chance,
            lost = outcome.items_lost.len(),
            "upgrade resolved"
        );
        self.phase = UpgradePhase::Resolved(outcome.clone());
        Ok(outcome)
    }

    /// Ends a resolved upgrade, clearing the selection. Returns the outcome
    /// that was being shown, if any.
    pub fn acknowledge(&mut self) -> Option<UpgradeOutcome> {
        match std::mem::take(&mut self.phase) {
            UpgradePhase::Resolved(outcome) => {
                self.selection.clear();
                self.manual_chance = None;
                Some(outcome)
            }
            other => {
                self.phase = other;
                None
            }
        }
    }
}
