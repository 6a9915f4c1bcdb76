use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality tier of an item, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rarity {
    #[serde(rename = "Consumer Grade")]
    ConsumerGrade,
    #[serde(rename = "Industrial Grade")]
    IndustrialGrade,
    #[serde(rename = "Mil-Spec")]
    MilSpec,
    Restricted,
    Classified,
    Covert,
    #[serde(rename = "Rare Special")]
    RareSpecial,
}

impl Rarity {
    pub const ALL: [Rarity; 7] = [
        Rarity::ConsumerGrade,
        Rarity::IndustrialGrade,
        Rarity::MilSpec,
        Rarity::Restricted,
        Rarity::Classified,
        Rarity::Covert,
        Rarity::RareSpecial,
    ];

    pub fn from_index(i: u8) -> Option<Self> {
        Self::ALL.get(usize::from(i)).copied()
    }

    pub fn to_index(self) -> u8 {
        match self {
            Rarity::ConsumerGrade => 0,
            Rarity::IndustrialGrade => 1,
            Rarity::MilSpec => 2,
            Rarity::Restricted => 3,
            Rarity::Classified => 4,
            Rarity::Covert => 5,
            Rarity::RareSpecial => 6,
        }
    }

    /// The tier an upgrade promotes to, `None` at the top.
    pub fn next(self) -> Option<Self> {
        Self::from_index(self.to_index() + 1)
    }

    pub fn is_max(self) -> bool {
        self.next().is_none()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rarity::ConsumerGrade => "Consumer Grade",
            Rarity::IndustrialGrade => "Industrial Grade",
            Rarity::MilSpec => "Mil-Spec",
            Rarity::Restricted => "Restricted",
            Rarity::Classified => "Classified",
            Rarity::Covert => "Covert",
            Rarity::RareSpecial => "Rare Special",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
