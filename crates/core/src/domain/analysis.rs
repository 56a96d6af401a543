use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const UNTITLED_SOURCE: &str = "Untitled Source";

/// Analysis of a stock, commodity or index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(deserialize_with = "lenient_string")]
    pub symbol: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub suggestion: String,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub rationale: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient_object",
        skip_serializing_if = "Option::is_none"
    )]
    pub technical_analysis: Option<TechnicalAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalAnalysis {
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub patterns: Vec<ChartPattern>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPattern {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
}

/// Analysis of a YouTube channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YoutubeAnalysis {
    #[serde(deserialize_with = "lenient_string")]
    pub channel_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub overall_stance: String,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub key_themes: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub recent_videos_summary: Vec<VideoSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
}

/// Parsed analysis. The variant is fixed once, when the provider text is decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Analysis {
    Asset(AnalysisResult),
    Channel(YoutubeAnalysis),
}

impl Analysis {
    /// Symbol or channel name, whichever this variant carries.
    pub fn subject(&self) -> &str {
        match self {
            Analysis::Asset(a) => &a.symbol,
            Analysis::Channel(c) => &c.channel_name,
        }
    }

    pub fn as_asset(&self) -> Option<&AnalysisResult> {
        match self {
            Analysis::Asset(a) => Some(a),
            Analysis::Channel(_) => None,
        }
    }

    pub fn as_channel(&self) -> Option<&YoutubeAnalysis> {
        match self {
            Analysis::Asset(_) => None,
            Analysis::Channel(c) => Some(c),
        }
    }
}

/// A web page the provider consulted. The title is kept as returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Source {
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNTITLED_SOURCE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullAnalysis {
    pub analysis: Analysis,
    pub sources: Vec<Source>,
}

// Provider output is not contractually complete. Fields of the wrong type fall back to
// empty values instead of failing the whole analysis.

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_to_string(Value::deserialize(deserializer)?).unwrap_or_default())
}

/// A bare string becomes a one-element list; non-string items are dropped.
fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(scalar_to_string)
            .filter(|s| !s.trim().is_empty())
            .collect(),
        other => scalar_to_string(other)
            .filter(|s| !s.trim().is_empty())
            .into_iter()
            .collect(),
    })
}

/// Keeps the items that decode; a lone object is treated as a one-element list.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        obj @ Value::Object(_) => serde_json::from_value(obj).ok().into_iter().collect(),
        _ => Vec::new(),
    })
}

fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        obj @ Value::Object(_) => serde_json::from_value(obj).ok(),
        _ => None,
    })
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
