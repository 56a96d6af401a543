//! HTTP client for the notes backend (`/api/notes`).

use crate::domain::note::{normalize_key, ExpertNote, NewNote};
use crate::error::NotesBackendError;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const UNKNOWN_API_ERROR: &str = "An unknown API error occurred";

#[derive(Debug, Clone)]
pub struct NotesClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl NotesClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, NotesBackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| transport_error("failed to build notes http client", &e))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{path}", self.base_url.trim_end_matches('/'))
    }

    pub async fn list_notes(
        &self,
        symbol: &str,
        market: &str,
    ) -> Result<Vec<ExpertNote>, NotesBackendError> {
        let mut query = vec![("symbol", normalize_key(symbol))];
        let market = normalize_key(market);
        if !market.is_empty() {
            query.push(("market", market));
        }

        let res = self
            .http
            .get(self.url("/notes"))
            .query(&query)
            .send()
            .await
            .map_err(|e| transport_error("notes request failed", &e))?;

        let res = check_status(res).await?;
        res.json::<Vec<ExpertNote>>()
            .await
            .map_err(|e| transport_error("failed to decode notes list", &e))
    }

    pub async fn create_note(&self, note: &NewNote) -> Result<ExpertNote, NotesBackendError> {
        let res = self
            .http
            .post(self.url("/notes"))
            .json(&note.normalized())
            .send()
            .await
            .map_err(|e| transport_error("notes request failed", &e))?;

        let res = check_status(res).await?;
        res.json::<ExpertNote>()
            .await
            .map_err(|e| transport_error("failed to decode created note", &e))
    }

    pub async fn delete_note(&self, id: Uuid) -> Result<(), NotesBackendError> {
        let res = self
            .http
            .delete(self.url(&format!("/notes/{id}")))
            .send()
            .await
            .map_err(|e| transport_error("notes request failed", &e))?;

        check_status(res).await?;
        Ok(())
    }
}

async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, NotesBackendError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    let message = error_message(status, &body);
    tracing::warn!(status = status.as_u16(), %message, "notes backend returned an error");
    Err(NotesBackendError {
        status: Some(status.as_u16()),
        message,
    })
}

fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(message),
        }) if !message.trim().is_empty() => message,
        Ok(_) => format!("HTTP error! status: {}", status.as_u16()),
        Err(_) => UNKNOWN_API_ERROR.to_string(),
    }
}

fn transport_error(context: &str, err: &reqwest::Error) -> NotesBackendError {
    NotesBackendError {
        status: err.status().map(|s| s.as_u16()),
        message: format!("{context}: {err}"),
    }
}
