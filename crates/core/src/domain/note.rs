use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A free-text opinion attached to a (symbol, market) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertNote {
    pub id: Uuid,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub market: String,
    pub person: String,
    pub opinion: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNote {
    pub symbol: String,
    #[serde(default)]
    pub market: String,
    pub person: String,
    pub opinion: String,
}

impl NewNote {
    /// Upper-cases and trims the key, trims the free text.
    pub fn normalized(&self) -> NewNote {
        NewNote {
            symbol: normalize_key(&self.symbol),
            market: normalize_key(&self.market),
            person: self.person.trim().to_string(),
            opinion: self.opinion.trim().to_string(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.symbol.trim().is_empty(), "symbol must be non-empty");
        anyhow::ensure!(!self.person.trim().is_empty(), "person must be non-empty");
        anyhow::ensure!(!self.opinion.trim().is_empty(), "opinion must be non-empty");
        Ok(())
    }
}

/// Symbols and markets are compared trimmed and upper-cased.
pub fn normalize_key(s: &str) -> String {
    s.trim().to_uppercase()
}
