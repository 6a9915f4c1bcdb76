use crate::{money::Money, rarity::Rarity};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTemplate {
    pub name: String,
    pub weapon: String,
    pub skin: String,
    pub rarity: Rarity,
    pub price: Money,
    #[serde(default)]
    pub is_knife: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub id: u64,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub skins: Vec<ItemTemplate>,
}

/// Read-only set of purchasable cases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub cases: Vec<Case>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate case id {0}")]
    DuplicateCase(u64),
}

impl Catalog {
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(json)?;
        let mut seen = std::collections::HashSet::new();
        for case in &catalog.cases {
            if !seen.insert(case.id) {
                return Err(CatalogError::DuplicateCase(case.id));
            }
        }
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn case(&self, id: u64) -> Option<&Case> {
        self.cases.iter().find(|c| c.id == id)
    }
}
