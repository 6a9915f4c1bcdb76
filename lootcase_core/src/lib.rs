pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
pub mod money;
pub mod odds;
pub mod rarity;
pub mod rng;
pub mod selector;
pub mod session;
pub mod store;
pub mod upgrade;

pub use crate::bootstrap::{decode_state, parse_inventory, LoadedState};
pub use crate::catalog::{Case, Catalog, CatalogError, ItemTemplate};
pub use crate::config::{ConfigError, EconomyConfig};
pub use crate::error::{LootError, LootResult};
pub use crate::ledger::{
    EconomyState, InventoryItem, InventorySummary, Ledger, BALANCE_KEY, INVENTORY_KEY,
};
pub use crate::money::Money;
pub use crate::odds::RarityTable;
pub use crate::rarity::Rarity;
pub use crate::rng::{derive_hash_hex, ReplayRng};
pub use crate::selector::{draw_item, drop_odds, RarityOdds};
pub use crate::session::{CaseOpening, Session};
pub use crate::store::{KeyValueStore, MemoryStore, StoreError};
#[cfg(feature = "sqlite")]
pub use crate::store::{SqliteStore, DEFAULT_DB_PATH};
pub use crate::upgrade::{upgrade_chance, UpgradeEngine, UpgradeOutcome, UpgradePhase};
