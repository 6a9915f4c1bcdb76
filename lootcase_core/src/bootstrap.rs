// Corrupt persisted values are recovered, never returned as errors.

use crate::{
    ledger::{EconomyState, InventoryItem},
    money::Money,
};
use std::collections::HashSet;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedState {
    pub state: EconomyState,
    /// No balance had ever been persisted.
    pub first_run: bool,
}

/// Builds the economy state from the raw persisted balance and inventory.
pub fn decode_state(
    raw_balance: Option<&str>,
    raw_inventory: Option<&str>,
    starting_balance: Money,
) -> LoadedState {
    let Some(raw_balance) = raw_balance else {
        info!(balance = %starting_balance, "first run, starting fresh");
        return LoadedState {
            state: EconomyState::new(starting_balance, Vec::new()),
            first_run: true,
        };
    };

    let balance = Money::parse(raw_balance).unwrap_or_else(|| {
        warn!(value = %raw_balance, "unreadable balance, resetting to zero");
        Money::ZERO
    });
    let inventory = raw_inventory.map(parse_inventory).unwrap_or_default();

    LoadedState {
        state: EconomyState::new(balance, inventory),
        first_run: false,
    }
}

/// Parses the persisted inventory, falling back to empty on any defect.
pub fn parse_inventory(raw: &str) -> Vec<InventoryItem> {
    let items: Vec<InventoryItem> = match serde_json::from_str(raw) {
        Ok(items) => items,
        Err(err) => {
            warn!(%err, "unreadable inventory, starting empty");
            return Vec::new();
        }
    };
    let mut seen = HashSet::with_capacity(items.len());
    if items.iter().any(|item| !seen.insert(item.id)) {
        warn!("inventory has duplicate ids, starting empty");
        return Vec::new();
    }
    items
}
