use crate::{
    catalog::{Case, Catalog},
    config::EconomyConfig,
    error::{LootError, LootResult},
    ledger::{InventoryItem, InventorySummary, Ledger},
    money::Money,
    selector::{draw_item, drop_odds, RarityOdds},
    store::KeyValueStore,
    upgrade::{UpgradeEngine, UpgradeOutcome},
};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseOpening {
    pub case_id: u64,
    pub price_paid: Money,
    pub item: InventoryItem,
    pub balance: Money,
}

/// Openings and upgrades stay in flight until [`Session::settle`]; new work
/// fails with [`LootError::Busy`] until then.
pub struct Session<S, R> {
    catalog: Catalog,
    config: EconomyConfig,
    ledger: Ledger<S>,
    upgrades: UpgradeEngine,
    rng: R,
    opening: Option<CaseOpening>,
}

impl<S: KeyValueStore, R: Rng> Session<S, R> {
    /// Bootstraps the ledger from `store`.
    pub fn start(store: S, catalog: Catalog, config: EconomyConfig, rng: R) -> LootResult<Self> {
        let ledger = Ledger::bootstrap(store, config.starting_balance)?;
        info!(
            balance = %ledger.balance(),
            items = ledger.inventory().len(),
            cases = catalog.cases.len(),
            "session started"
        );
        Ok(Self {
            catalog,
            config,
            ledger,
            upgrades: UpgradeEngine::new(),
            rng,
            opening: None,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    pub fn upgrades(&self) -> &UpgradeEngine {
        &self.upgrades
    }

    pub fn balance(&self) -> Money {
        self.ledger.balance()
    }

    pub fn inventory(&self) -> &[InventoryItem] {
        self.ledger.inventory()
    }

    pub fn summary(&self, featured: usize) -> InventorySummary {
        self.ledger.state().summary(featured)
    }

    pub fn odds(&self, case_id: u64) -> LootResult<Vec<RarityOdds>> {
        Ok(drop_odds(self.case(case_id)?, &self.config.rarity))
    }

    /// Reloads balance and inventory written by other clients.
    pub fn refresh(&mut self) -> LootResult<()> {
        self.ledger.refresh()
    }

    pub fn is_busy(&self) -> bool {
        self.opening.is_some() || self.upgrades.is_busy()
    }

    fn ensure_idle(&self) -> LootResult<()> {
        if self.is_busy() {
            return Err(LootError::Busy);
        }
        Ok(())
    }

    fn case(&self, case_id: u64) -> LootResult<&Case> {
        self.catalog
            .case(case_id)
            .ok_or(LootError::CaseNotFound(case_id))
    }

    /// Buys a case and adds the drawn item. Nothing is debited when the case
    /// is empty or unaffordable.
    pub fn open_case(&mut self, case_id: u64) -> LootResult<CaseOpening> {
        self.ensure_idle()?;
        self.ledger.refresh()?;
        let case = self
            .catalog
            .case(case_id)
            .ok_or(LootError::CaseNotFound(case_id))?;
        if case.skins.is_empty() {
            return Err(LootError::EmptyCase { case_id });
        }
        let price = case.price;
        let balance = self.ledger.balance();
        if price > balance {
            return Err(LootError::InsufficientFunds {
                balance,
                needed: price,
            });
        }

        let template = draw_item(case, &self.config.rarity, &mut self.rng)?;
        let now = Utc::now();
        let (item, balance) = self.ledger.apply(|state| {
            let balance = state.debit(price)?;
            Ok((state.add_item(template, now), balance))
        })?;
        info!(
            case_id,
            item = %item.name,
            rarity = %item.rarity,
            balance = %balance,
            "opened case"
        );

        let opening = CaseOpening {
            case_id,
            price_paid: price,
            item,
            balance,
        };
        self.opening = Some(opening.clone());
        Ok(opening)
    }

    pub fn sell_item(&mut self, id: u64) -> LootResult<InventoryItem> {
        self.ensure_idle()?;
        let sold = self.ledger.sell_item(id)?;
        // a sold item can no longer be fuel
        self.upgrades.deselect(id)?;
        Ok(sold)
    }

    pub fn select(&mut self, id: u64) -> LootResult<()> {
        self.upgrades.select(&self.ledger, id)
    }

    pub fn deselect(&mut self, id: u64) -> LootResult<bool> {
        self.upgrades.deselect(id)
    }

    pub fn toggle(&mut self, id: u64) -> LootResult<bool> {
        self.upgrades.toggle(&self.ledger, id)
    }

    pub fn set_manual_chance(&mut self, chance: Option<u8>) -> LootResult<()> {
        self.upgrades.set_manual_chance(chance)
    }

    pub fn clear_selection(&mut self) -> LootResult<()> {
        self.upgrades.clear()
    }

    pub fn upgrade_chance(&self) -> LootResult<u8> {
        self.upgrades.chance(&self.ledger, &self.config.rarity)
    }

    pub fn resolve_upgrade(&mut self) -> LootResult<UpgradeOutcome> {
        self.ensure_idle()?;
        self.ledger.refresh()?;
        self.upgrades
            .resolve(&mut self.ledger, &self.config, &mut self.rng)
    }

    /// Replaces the selection with `ids` and resolves it in one call. The
    /// selection is cleared again when any id is rejected.
    pub fn upgrade(&mut self, ids: &[u64], manual_chance: Option<u8>) -> LootResult<UpgradeOutcome> {
        self.ensure_idle()?;
        self.ledger.refresh()?;
        self.upgrades.clear()?;
        let staged = ids
            .iter()
            .try_for_each(|&id| self.upgrades.select(&self.ledger, id))
            .and_then(|()| self.upgrades.set_manual_chance(manual_chance));
        if let Err(err) = staged {
            self.upgrades.clear()?;
            return Err(err);
        }
        self.resolve_upgrade()
    }

    /// Finishes whatever result is being revealed so new work can start.
    pub fn settle(&mut self) {
        self.opening = None;
        self.upgrades.acknowledge();
    }

    /// Restores the starting balance and empties the inventory.
    pub fn reset(&mut self) -> LootResult<()> {
        self.ensure_idle()?;
        self.upgrades.clear()?;
        self.ledger.reset(self.config.starting_balance)?;
        info!(balance = %self.ledger.balance(), "economy reset");
        Ok(())
    }
}
