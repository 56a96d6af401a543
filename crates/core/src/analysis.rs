use crate::domain::analysis::FullAnalysis;
use crate::domain::query::AssetQuery;
use crate::error::AnalysisError;
use crate::llm::error::ProviderHttpError;
use crate::llm::{json, GenerateRequest, GroundedGenerator};
use crate::prompt;
use std::sync::Arc;

/// Turns an [`AssetQuery`] into a [`FullAnalysis`] with one grounded provider call.
///
/// Holds no per-request state; share it behind an `Arc` or clone it freely. Cancellation
/// is the caller's concern: dropping the returned future abandons the provider call.
#[derive(Clone)]
pub struct AnalysisRequester {
    generator: Arc<dyn GroundedGenerator>,
}

impl AnalysisRequester {
    pub fn new(generator: Arc<dyn GroundedGenerator>) -> Self {
        Self { generator }
    }

    pub async fn request_analysis(&self, query: &AssetQuery) -> Result<FullAnalysis, AnalysisError> {
        query.validate()?;

        let prompt = prompt::build_prompt(query);
        let req = GenerateRequest {
            model: self.generator.model().to_string(),
            prompt,
            grounding: true,
        };

        tracing::info!(
            asset_type = %query.asset_type,
            identifier = %query.identifier.trim(),
            provider = ?self.generator.provider(),
            model = %req.model,
            "requesting analysis"
        );

        let res = self.generator.generate(req).await.map_err(|err| {
            if let Some(diag) = err.downcast_ref::<ProviderHttpError>() {
                tracing::error!(
                    asset_type = %query.asset_type,
                    stage = diag.stage,
                    status = ?diag.status,
                    raw_output = diag.raw_output.as_deref().unwrap_or_default(),
                    raw_response_json = ?diag.raw_response_json,
                    error = %diag,
                    "provider call failed"
                );
            } else {
                tracing::error!(
                    asset_type = %query.asset_type,
                    error = %format!("{err:#}"),
                    "provider call failed"
                );
            }
            AnalysisError::Provider(provider_message(&err))
        })?;

        let analysis = json::parse_analysis(&res.text).inspect_err(|err| {
            if let AnalysisError::MalformedResponse { detail, raw_text } = err {
                tracing::warn!(
                    asset_type = %query.asset_type,
                    %detail,
                    raw_text = %raw_text,
                    "failed to parse provider response"
                );
            }
        })?;

        let sources = json::extract_sources(&res.citations);

        tracing::info!(
            asset_type = %query.asset_type,
            subject = %analysis.subject(),
            sources = sources.len(),
            "analysis ready"
        );

        Ok(FullAnalysis { analysis, sources })
    }
}

/// Upstream message for the user; HTTP diagnostics contribute only their detail.
fn provider_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ProviderHttpError>() {
        Some(diag) => match diag.status {
            Some(status) => format!("HTTP {status}: {}", diag.detail),
            None => diag.detail.clone(),
        },
        None => format!("{err:#}"),
    }
}
