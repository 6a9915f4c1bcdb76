use crate::{money::Money, store::StoreError};

#[derive(Debug, thiserror::Error)]
pub enum LootError {
    #[error("case {case_id} has no items")]
    EmptyCase { case_id: u64 },
    #[error("case {0} does not exist")]
    CaseNotFound(u64),
    #[error("insufficient funds: balance {balance}, need {needed}")]
    InsufficientFunds { balance: Money, needed: Money },
    #[error("inventory item {0} not found")]
    ItemNotFound(u64),
    #[error("no items selected for upgrade")]
    EmptySelection,
    #[error("item {0} is already at the highest rarity")]
    AlreadyMaxRarity(u64),
    #[error("another case opening or upgrade is still in progress")]
    Busy,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type LootResult<T> = Result<T, LootError>;
