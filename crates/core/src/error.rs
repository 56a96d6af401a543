use thiserror::Error;

pub const UNEXPECTED_FORMAT_MESSAGE: &str =
    "The AI returned a response in an unexpected format. Please try again.";

/// Failures surfaced by the analysis requester. Nothing is retried.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Rejected before any network call was made.
    #[error("{0}")]
    InvalidInput(String),

    /// Provider text was not JSON, or carried neither `symbol` nor `channelName`.
    #[error("{}", UNEXPECTED_FORMAT_MESSAGE)]
    MalformedResponse { detail: String, raw_text: String },

    /// Network, authentication or rate-limit failure from the provider.
    #[error("Failed to get analysis: {0}")]
    Provider(String),
}

impl AnalysisError {
    pub fn malformed(detail: impl Into<String>, raw_text: impl Into<String>) -> Self {
        AnalysisError::MalformedResponse {
            detail: detail.into(),
            raw_text: raw_text.into(),
        }
    }
}

/// Non-2xx or transport failure from the notes backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NotesBackendError {
    pub status: Option<u16>,
    pub message: String,
}
