use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Stock,
    Commodity,
    Index,
    Youtube,
}

impl AssetType {
    pub const ALL: [AssetType; 4] = [
        AssetType::Stock,
        AssetType::Commodity,
        AssetType::Index,
        AssetType::Youtube,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetType::Stock => "stock",
            AssetType::Commodity => "commodity",
            AssetType::Index => "index",
            AssetType::Youtube => "youtube",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        AssetType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!("unknown asset type {s:?} (expected stock, commodity, index or youtube)")
            })
    }
}

/// One user submission. Built per request and dropped once the request completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetQuery {
    pub asset_type: AssetType,
    pub identifier: String,

    /// Market for stocks, topic of interest for channels. Empty when unused.
    #[serde(default)]
    pub auxiliary: String,

    /// Members-only transcript pasted by the user (channels only).
    #[serde(default)]
    pub supplementary_text: Option<String>,
}

impl AssetQuery {
    pub fn new(asset_type: AssetType, identifier: impl Into<String>) -> Self {
        Self {
            asset_type,
            identifier: identifier.into(),
            auxiliary: String::new(),
            supplementary_text: None,
        }
    }

    pub fn with_auxiliary(mut self, auxiliary: impl Into<String>) -> Self {
        self.auxiliary = auxiliary.into();
        self
    }

    pub fn with_supplementary_text(mut self, text: impl Into<String>) -> Self {
        self.supplementary_text = Some(text.into());
        self
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.identifier.trim().is_empty() {
            let noun = match self.asset_type {
                AssetType::Stock => "stock symbol",
                AssetType::Commodity => "commodity name",
                AssetType::Index => "index name",
                AssetType::Youtube => "YouTube channel handle",
            };
            return Err(AnalysisError::InvalidInput(format!(
                "Please enter a {noun}."
            )));
        }
        Ok(())
    }

    /// Auxiliary text with surrounding whitespace removed, `None` when blank.
    pub fn auxiliary_trimmed(&self) -> Option<&str> {
        let s = self.auxiliary.trim();
        (!s.is_empty()).then_some(s)
    }

    pub fn supplementary_trimmed(&self) -> Option<&str> {
        self.supplementary_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_identifier_for_every_asset_type() {
        for asset_type in AssetType::ALL {
            let q = AssetQuery::new(asset_type, "   ");
            assert!(matches!(q.validate(), Err(AnalysisError::InvalidInput(_))));
        }
    }

    #[test]
    fn parses_asset_type_case_insensitively() {
        assert_eq!("Stock".parse::<AssetType>().unwrap(), AssetType::Stock);
        assert_eq!(" youtube ".parse::<AssetType>().unwrap(), AssetType::Youtube);
        assert!("bond".parse::<AssetType>().is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let q: AssetQuery =
            serde_json::from_str(r#"{"assetType":"index","identifier":"nifty 50"}"#).unwrap();
        assert_eq!(q.asset_type, AssetType::Index);
        assert_eq!(q.auxiliary, "");
        assert_eq!(q.supplementary_text, None);
        assert_eq!(q.auxiliary_trimmed(), None);
    }

    #[test]
    fn blank_supplementary_text_is_ignored() {
        let q = AssetQuery::new(AssetType::Youtube, "@chan").with_supplementary_text(" \n ");
        assert_eq!(q.supplementary_trimmed(), None);
    }
}
