use lootcase_core::{
    CaseOpening, InventoryItem, InventorySummary, LootError, Money, RarityOdds, UpgradeOutcome,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CaseView {
    pub id: u64,
    pub name: String,
    pub price: Money,
    pub item_count: usize,
    pub odds: Vec<RarityOdds>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CasesResponse {
    pub cases: Vec<CaseView>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StateResponse {
    pub balance: Money,
    pub inventory: Vec<InventoryItem>,
    pub summary: InventorySummary,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenCaseRequest {
    pub case_id: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenCaseResponse {
    pub opening: CaseOpening,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SellRequest {
    pub item_id: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SellResponse {
    pub sold: InventoryItem,
    pub balance: Money,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UpgradeRequest {
    pub item_ids: Vec<u64>,
    /// Percent override, only honoured for single-item upgrades.
    #[serde(default)]
    pub manual_chance: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UpgradeResponse {
    pub outcome: UpgradeOutcome,
    pub balance: Money,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    InsufficientFunds(String),
    #[error("a previous result is still in flight")]
    Busy,
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    /// HTTP status code the error is reported with.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Invalid(_) => 400,
            ApiError::InsufficientFunds(_) => 402,
            ApiError::NotFound(_) => 404,
            ApiError::Busy => 409,
            ApiError::Internal => 500,
        }
    }
}

impl From<LootError> for ApiError {
    fn from(err: LootError) -> Self {
        match err {
            LootError::CaseNotFound(_) | LootError::ItemNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            LootError::InsufficientFunds { .. } => ApiError::InsufficientFunds(err.to_string()),
            LootError::EmptyCase { .. }
            | LootError::EmptySelection
            | LootError::AlreadyMaxRarity(_) => ApiError::Invalid(err.to_string()),
            LootError::Busy => ApiError::Busy,
            LootError::Store(_) => ApiError::Internal,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
