use crate::{
    bootstrap,
    catalog::ItemTemplate,
    error::{LootError, LootResult},
    money::Money,
    rarity::Rarity,
    store::{KeyValueStore, StoreError},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const BALANCE_KEY: &str = "userBalance";
pub const INVENTORY_KEY: &str = "userInventory";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: u64,
    pub name: String,
    pub weapon: String,
    pub skin: String,
    pub rarity: Rarity,
    pub price: Money,
    #[serde(default)]
    pub is_knife: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgraded_from: Option<Rarity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgraded_at: Option<DateTime<Utc>>,
}

impl InventoryItem {
    pub fn from_template(id: u64, template: &ItemTemplate) -> Self {
        Self {
            id,
            name: template.name.clone(),
            weapon: template.weapon.clone(),
            skin: template.skin.clone(),
            rarity: template.rarity,
            price: template.price,
            is_knife: template.is_knife,
            upgraded_from: None,
            upgraded_at: None,
        }
    }

    pub fn template(&self) -> ItemTemplate {
        ItemTemplate {
            name: self.name.clone(),
            weapon: self.weapon.clone(),
            skin: self.skin.clone(),
            rarity: self.rarity,
            price: self.price,
            is_knife: self.is_knife,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub item_count: usize,
    pub total_value: Money,
    /// Most valuable items, highest price first.
    pub featured: Vec<InventoryItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EconomyState {
    balance: Money,
    inventory: Vec<InventoryItem>,
    last_id: u64,
}

impl EconomyState {
    /// Callers must pass an inventory with unique ids.
    pub fn new(balance: Money, inventory: Vec<InventoryItem>) -> Self {
        let last_id = inventory.iter().map(|item| item.id).max().unwrap_or(0);
        Self {
            balance,
            inventory,
            last_id,
        }
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn inventory(&self) -> &[InventoryItem] {
        &self.inventory
    }

    pub fn item(&self, id: u64) -> Option<&InventoryItem> {
        self.inventory.iter().find(|item| item.id == id)
    }

    pub fn debit(&mut self, amount: Money) -> LootResult<Money> {
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(LootError::InsufficientFunds {
                balance: self.balance,
                needed: amount,
            })?;
        Ok(self.balance)
    }

    pub fn credit(&mut self, amount: Money) -> Money {
        self.balance = self.balance.saturating_add(amount);
        self.balance
    }

    // Millisecond timestamps, bumped past every id handed out before. Once
    // u64::MAX has been issued the smallest free id is reused.
    fn next_id(&mut self, now: DateTime<Utc>) -> u64 {
        let Some(bumped) = self.last_id.checked_add(1) else {
            return (1..=u64::MAX)
                .find(|&id| self.item(id).is_none())
                .unwrap_or(0);
        };
        let ts = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        self.last_id = ts.max(bumped);
        self.last_id
    }

    pub fn add_item(&mut self, template: &ItemTemplate, now: DateTime<Utc>) -> InventoryItem {
        let id = self.next_id(now);
        let item = InventoryItem::from_template(id, template);
        self.inventory.push(item.clone());
        item
    }

    pub fn remove_item(&mut self, id: u64) -> LootResult<InventoryItem> {
        let index = self
            .inventory
            .iter()
            .position(|item| item.id == id)
            .ok_or(LootError::ItemNotFound(id))?;
        Ok(self.inventory.remove(index))
    }

    /// Swaps in a new template under the same id and position, recording the
    /// rarity it replaced.
    pub fn replace_item(
        &mut self,
        id: u64,
        template: &ItemTemplate,
        now: DateTime<Utc>,
    ) -> LootResult<InventoryItem> {
        let slot = self
            .inventory
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(LootError::ItemNotFound(id))?;
        let previous = slot.rarity;
        *slot = InventoryItem {
            upgraded_from: Some(previous),
            upgraded_at: Some(now),
            ..InventoryItem::from_template(id, template)
        };
        Ok(slot.clone())
    }

    pub fn summary(&self, featured: usize) -> InventorySummary {
        let mut by_price: Vec<&InventoryItem> = self.inventory.iter().collect();
        by_price.sort_by(|a, b| b.price.cmp(&a.price));
        InventorySummary {
            item_count: self.inventory.len(),
            total_value: self.inventory.iter().map(|item| item.price).sum(),
            featured: by_price.into_iter().take(featured).cloned().collect(),
        }
    }

    /// Items that can still be promoted to a higher tier.
    pub fn upgrade_candidates(&self) -> impl Iterator<Item = &InventoryItem> {
        self.inventory.iter().filter(|item| !item.rarity.is_max())
    }
}

const KEYS: [&str; 2] = [BALANCE_KEY, INVENTORY_KEY];

fn encode_state(state: &EconomyState) -> Result<Vec<String>, StoreError> {
    Ok(vec![
        state.balance.to_string(),
        serde_json::to_string(&state.inventory)?,
    ])
}

fn decode_values(values: &[Option<String>], starting_balance: Money) -> bootstrap::LoadedState {
    bootstrap::decode_state(
        values.first().and_then(Option::as_deref),
        values.get(1).and_then(Option::as_deref),
        starting_balance,
    )
}

/// The store is the source of truth: every call re-reads both keys, applies
/// its change to that fresh state and writes it back in one critical section.
/// The in-memory state is the copy seen by the last call.
pub struct Ledger<S> {
    store: S,
    state: EconomyState,
    starting_balance: Money,
}

impl<S: KeyValueStore> Ledger<S> {
    /// Hydrates from the store, writing the starting state on first run.
    pub fn bootstrap(mut store: S, starting_balance: Money) -> LootResult<Self> {
        let state = store.update(&KEYS, |values| -> Result<_, StoreError> {
            let loaded = decode_values(&values, starting_balance);
            let write = if loaded.first_run {
                Some(encode_state(&loaded.state)?)
            } else {
                None
            };
            Ok((write, loaded.state))
        })?;
        Ok(Self {
            store,
            state,
            starting_balance,
        })
    }

    pub fn state(&self) -> &EconomyState {
        &self.state
    }

    pub fn balance(&self) -> Money {
        self.state.balance()
    }

    pub fn inventory(&self) -> &[InventoryItem] {
        self.state.inventory()
    }

    pub fn item(&self, id: u64) -> Option<&InventoryItem> {
        self.state.item(id)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Picks up changes other clients made to the store.
    pub fn refresh(&mut self) -> LootResult<()> {
        let values = self.store.read(&KEYS)?;
        let mut fresh = decode_values(&values, self.starting_balance).state;
        fresh.last_id = fresh.last_id.max(self.state.last_id);
        self.state = fresh;
        Ok(())
    }

    /// Runs `f` against the current persisted state and writes the result
    /// back atomically. Nothing changes if `f` or the write fails.
    pub fn apply<T>(
        &mut self,
        f: impl FnOnce(&mut EconomyState) -> LootResult<T>,
    ) -> LootResult<T> {
        let starting_balance = self.starting_balance;
        let last_id = self.state.last_id;
        let (next, out) = self.store.update(&KEYS, |values| -> LootResult<_> {
            let mut next = decode_values(&values, starting_balance).state;
            // ids this ledger issued stay retired
            next.last_id = next.last_id.max(last_id);
            let out = f(&mut next)?;
            Ok((Some(encode_state(&next)?), (next, out)))
        })?;
        self.state = next;
        Ok(out)
    }

    pub fn debit(&mut self, amount: Money) -> LootResult<Money> {
        self.apply(|state| state.debit(amount))
    }

    pub fn credit(&mut self, amount: Money) -> LootResult<Money> {
        self.apply(|state| Ok(state.credit(amount)))
    }

    pub fn add_item(&mut self, template: &ItemTemplate) -> LootResult<InventoryItem> {
        let now = Utc::now();
        self.apply(|state| Ok(state.add_item(template, now)))
    }

    pub fn remove_item(&mut self, id: u64) -> LootResult<InventoryItem> {
        self.apply(|state| state.remove_item(id))
    }

    pub fn replace_item(&mut self, id: u64, template: &ItemTemplate) -> LootResult<InventoryItem> {
        let now = Utc::now();
        self.apply(|state| state.replace_item(id, template, now))
    }

    /// Removes the item and credits its price in one write.
    pub fn sell_item(&mut self, id: u64) -> LootResult<InventoryItem> {
        let sold = self.apply(|state| {
            let item = state.remove_item(id)?;
            state.credit(item.price);
            Ok(item)
        })?;
        info!(id, price = %sold.price, balance = %self.balance(), "sold item");
        Ok(sold)
    }

    /// Wipes the inventory and restores the starting balance.
    pub fn reset(&mut self, starting_balance: Money) -> LootResult<()> {
        self.apply(|state| {
            *state = EconomyState::new(starting_balance, Vec::new());
            Ok(())
        })
    }
}
