use crate::config::Settings;
use crate::llm::error::ProviderHttpError;
use crate::llm::{CitationChunk, GenerateRequest, GenerateResponse, GroundedGenerator, Provider};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Self::new(
            settings.require_gemini_api_key()?.to_string(),
            settings.gemini_base_url.clone(),
            settings.gemini_model.clone(),
            settings.gemini_timeout(),
        )
    }

    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
        })
    }

    fn url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{model}:generateContent",
            self.base_url.trim_end_matches('/')
        )
    }

    async fn generate_content(
        &self,
        model: &str,
        req: &GenerateContentRequest,
    ) -> anyhow::Result<GenerateContentResponse> {
        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", HeaderValue::from_str(&self.api_key)?);

        let res = self
            .http
            .post(self.url(model))
            .headers(headers)
            .json(req)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Gemini response body")?;
        if !status.is_success() {
            let raw_response_json = serde_json::from_str::<serde_json::Value>(&text).ok();
            let detail = raw_response_json
                .as_ref()
                .and_then(|v| v.pointer("/error/message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(ProviderHttpError {
                provider: Provider::Gemini,
                stage: "http",
                status: Some(status.as_u16()),
                detail,
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        }

        serde_json::from_str::<GenerateContentResponse>(&text)
            .with_context(|| format!("failed to decode Gemini response JSON: {text}"))
    }

    fn into_generate_response(res: GenerateContentResponse) -> anyhow::Result<GenerateResponse> {
        let Some(candidate) = res.candidates.into_iter().next() else {
            let reason = res
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(ProviderHttpError {
                provider: Provider::Gemini,
                stage: "candidates",
                status: None,
                detail: format!("Gemini returned no answer ({reason})"),
                raw_output: None,
                raw_response_json: None,
            }
            .into());
        };

        let mut text = String::new();
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(t) = part.text {
                text.push_str(&t);
            }
        }

        let citations = candidate
            .grounding_metadata
            .map(|m| m.grounding_chunks)
            .unwrap_or_default();

        Ok(GenerateResponse { text, citations })
    }
}

#[async_trait::async_trait]
impl GroundedGenerator for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, req: GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: req.prompt }],
            }],
            tools: req.grounding.then(|| vec![Tool::google_search()]),
        };

        let t0 = std::time::Instant::now();
        let res = self.generate_content(&req.model, &body).await?;
        let out = Self::into_generate_response(res)?;
        tracing::debug!(
            model = %req.model,
            elapsed_ms = t0.elapsed().as_millis(),
            text_len = out.text.len(),
            citations = out.citations.len(),
            "Gemini generateContent finished"
        );
        Ok(out)
    }
}

#[derive(Debug, Clone, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Clone, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    google_search: serde_json::Value,
}

impl Tool {
    fn google_search() -> Self {
        Self {
            google_search: serde_json::json!({}),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<CitationChunk>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_enables_google_search_tool() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart {
                    text: "hi".to_string(),
                }],
            }],
            tools: Some(vec![Tool::google_search()]),
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["tools"], json!([{"google_search": {}}]));
        assert_eq!(v["contents"][0]["parts"][0]["text"], json!("hi"));
    }

    #[test]
    fn collects_text_parts_and_grounding_chunks() {
        let raw = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "```json\n{\"symbol\":"}, {"text": "\"AAPL\"}\n```"}]},
                "groundingMetadata": {
                    "webSearchQueries": ["aapl news"],
                    "groundingChunks": [
                        {"web": {"uri": "https://example.com/a", "title": "example.com"}},
                        {"retrievedContext": {"uri": "gs://x"}}
                    ]
                }
            }]
        });
        let res: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let out = GeminiClient::into_generate_response(res).unwrap();
        assert_eq!(out.text, "```json\n{\"symbol\":\"AAPL\"}\n```");
        assert_eq!(out.citations.len(), 2);
        assert!(out.citations[1].web.is_none());
    }

    #[test]
    fn blocked_prompt_is_a_provider_error() {
        let raw = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let res: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let err = GeminiClient::into_generate_response(res).unwrap_err();
        let diag = err.downcast_ref::<ProviderHttpError>().unwrap();
        assert_eq!(diag.stage, "candidates");
        assert!(diag.detail.contains("SAFETY"));
    }

    mod http {
        use super::*;
        use crate::analysis::AnalysisRequester;
        use crate::domain::query::{AssetQuery, AssetType};
        use crate::error::AnalysisError;
        use axum::extract::{Path, State};
        use axum::http::{HeaderMap as AxumHeaders, StatusCode};
        use axum::routing::post;
        use axum::{Json, Router};
        use std::sync::{Arc, Mutex};

        #[derive(Debug, Default)]
        struct Seen {
            target: Option<String>,
            api_key: Option<String>,
            body: Option<serde_json::Value>,
        }

        #[derive(Clone)]
        struct Stub {
            seen: Arc<Mutex<Seen>>,
            status: StatusCode,
            reply: serde_json::Value,
        }

        async fn generate_content(
            State(stub): State<Stub>,
            Path(target): Path<String>,
            headers: AxumHeaders,
            Json(body): Json<serde_json::Value>,
        ) -> (StatusCode, Json<serde_json::Value>) {
            let mut seen = stub.seen.lock().unwrap();
            seen.target = Some(target);
            seen.api_key = headers
                .get("x-goog-api-key")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            seen.body = Some(body);
            (stub.status, Json(stub.reply.clone()))
        }

        async fn serve(status: StatusCode, reply: serde_json::Value) -> (String, Arc<Mutex<Seen>>) {
            let seen = Arc::new(Mutex::new(Seen::default()));
            let app = Router::new()
                .route("/v1beta/models/:target", post(generate_content))
                .with_state(Stub {
                    seen: seen.clone(),
                    status,
                    reply,
                });
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            (format!("http://{addr}/"), seen)
        }

        fn requester(base_url: String) -> AnalysisRequester {
            let client = GeminiClient::new(
                "test-key".to_string(),
                base_url,
                "gemini-test".to_string(),
                Duration::from_secs(5),
            )
            .unwrap();
            AnalysisRequester::new(Arc::new(client))
        }

        #[tokio::test]
        async fn non_success_status_surfaces_gemini_message() {
            let (base_url, seen) = serve(
                StatusCode::TOO_MANY_REQUESTS,
                json!({"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}),
            )
            .await;

            let err = requester(base_url)
                .request_analysis(&AssetQuery::new(AssetType::Stock, "aapl"))
                .await
                .unwrap_err();
            match err {
                AnalysisError::Provider(msg) => {
                    assert!(msg.contains("Quota exceeded"), "{msg}");
                    assert!(msg.contains("429"), "{msg}");
                }
                other => panic!("unexpected error: {other:?}"),
            }

            let seen = seen.lock().unwrap();
            assert_eq!(seen.target.as_deref(), Some("gemini-test:generateContent"));
            assert_eq!(seen.api_key.as_deref(), Some("test-key"));
        }

        #[tokio::test]
        async fn success_sends_grounded_request_and_parses_reply() {
            let (base_url, seen) = serve(
                StatusCode::OK,
                json!({
                    "candidates": [{
                        "content": {"parts": [{"text": "```json\n{\"symbol\":\"AAPL\",\"suggestion\":\"Hold\"}\n```"}]},
                        "groundingMetadata": {"groundingChunks": [
                            {"web": {"uri": "https://example.com/a", "title": "A"}},
                            {"web": {"uri": ""}}
                        ]}
                    }]
                }),
            )
            .await;

            let full = requester(base_url)
                .request_analysis(&AssetQuery::new(AssetType::Stock, "aapl"))
                .await
                .unwrap();
            assert_eq!(full.analysis.subject(), "AAPL");
            assert_eq!(full.sources.len(), 1);

            let seen = seen.lock().unwrap();
            let body = seen.body.as_ref().unwrap();
            assert_eq!(body["tools"], json!([{"google_search": {}}]));
            assert!(body["contents"][0]["parts"][0]["text"]
                .as_str()
                .unwrap()
                .contains("\"AAPL\""));
        }
    }
}
