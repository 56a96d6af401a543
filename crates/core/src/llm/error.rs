use crate::llm::Provider;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone)]
pub struct ProviderHttpError {
    pub provider: Provider,
    pub stage: &'static str,
    pub status: Option<u16>,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl fmt::Display for ProviderHttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "{:?} error (stage={}, status={status}): {}",
                self.provider, self.stage, self.detail
            ),
            None => write!(
                f,
                "{:?} error (stage={}): {}",
                self.provider, self.stage, self.detail
            ),
        }
    }
}

impl std::error::Error for ProviderHttpError {}
