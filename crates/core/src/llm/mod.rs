pub mod error;
pub mod gemini;
pub mod json;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    /// Ask the provider to ground the answer in live web search.
    pub grounding: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateResponse {
    pub text: String,
    pub citations: Vec<CitationChunk>,
}

/// One grounding reference as returned by the provider. Either part may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationChunk {
    #[serde(default)]
    pub web: Option<WebCitation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebCitation {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
}

#[async_trait::async_trait]
pub trait GroundedGenerator: Send + Sync {
    fn provider(&self) -> Provider;

    /// Model identifier sent with every request.
    fn model(&self) -> &str;

    async fn generate(&self, req: GenerateRequest) -> anyhow::Result<GenerateResponse>;
}
