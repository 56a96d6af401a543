use crate::domain::analysis::{Analysis, AnalysisResult, Source, YoutubeAnalysis};
use crate::error::AnalysisError;
use crate::llm::CitationChunk;
use serde_json::Value;

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// Returns the body of the first ```json fenced block, or the whole trimmed text.
pub fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    // ASCII lowercasing keeps byte offsets stable.
    let lowered = trimmed.to_ascii_lowercase();
    if let Some(open) = lowered.find(JSON_FENCE) {
        let body_start = open + JSON_FENCE.len();
        if let Some(len) = trimmed[body_start..].find(FENCE) {
            return trimmed[body_start..body_start + len].trim();
        }
    }

    // Untagged fence wrapping the whole reply.
    if let Some(rest) = trimmed.strip_prefix(FENCE) {
        if let Some((_, body)) = rest.split_once('\n') {
            if let Some(end) = body.rfind(FENCE) {
                return body[..end].trim();
            }
        }
    }

    trimmed
}

pub fn parse_analysis(text: &str) -> Result<Analysis, AnalysisError> {
    let json_str = extract_json(text);

    let value = serde_json::from_str::<Value>(json_str).map_err(|e| {
        AnalysisError::malformed(format!("response is not valid JSON: {e}"), json_str)
    })?;

    let Some(object) = value.as_object() else {
        return Err(AnalysisError::malformed(
            "response is not a JSON object",
            json_str,
        ));
    };

    // Only the discriminator is checked; nested fields decode leniently.
    if object.contains_key("symbol") {
        let asset = serde_json::from_value::<AnalysisResult>(value).map_err(|e| {
            AnalysisError::malformed(format!("asset analysis could not be decoded: {e}"), json_str)
        })?;
        return Ok(Analysis::Asset(asset));
    }

    if object.contains_key("channelName") {
        let channel = serde_json::from_value::<YoutubeAnalysis>(value).map_err(|e| {
            AnalysisError::malformed(
                format!("channel analysis could not be decoded: {e}"),
                json_str,
            )
        })?;
        return Ok(Analysis::Channel(channel));
    }

    Err(AnalysisError::malformed(
        "response has neither `symbol` nor `channelName`",
        json_str,
    ))
}

/// Keeps citations that expose a non-empty URI, in provider order.
pub fn extract_sources(citations: &[CitationChunk]) -> Vec<Source> {
    citations
        .iter()
        .filter_map(|chunk| chunk.web.as_ref())
        .filter_map(|web| {
            let uri = web.uri.as_deref()?;
            if uri.trim().is_empty() {
                return None;
            }
            Some(Source {
                uri: uri.to_string(),
                title: web.title.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_json_handles_fenced_blocks() {
        let body = r#"{"symbol":"AAPL","suggestion":"Hold","rationale":["a"]}"#;
        let fenced = format!("```json\n{body}\n```");
        assert_eq!(extract_json(&fenced), body);
    }

    #[test]
    fn extract_json_takes_first_block_after_prose() {
        let text = "Here you go:\n```json\n{\"a\":1}\n```\nand\n```json\n{\"b\":2}\n```";
        assert_eq!(extract_json(text), "{\"a\":1}");
    }

    #[test]
    fn extract_json_handles_untagged_fence() {
        assert_eq!(extract_json("```\n{\"a\":1}\n```\n"), "{\"a\":1}");
    }

    #[test]
    fn extract_json_without_fence_uses_trimmed_text() {
        assert_eq!(extract_json("  \n{\"a\":1}\n "), "{\"a\":1}");
    }

    #[test]
    fn extract_json_leaves_unclosed_fence_alone() {
        assert_eq!(extract_json("```json\n{\"a\":1}"), "```json\n{\"a\":1}");
    }

    #[test]
    fn parse_analysis_discriminates_asset_variant() {
        let text = "```json\n{\"symbol\":\"AAPL\",\"suggestion\":\"Hold\",\"rationale\":[\"r1\",\"r2\"]}\n```";
        let analysis = parse_analysis(text).unwrap();
        let asset = analysis.as_asset().unwrap();
        assert_eq!(asset.symbol, "AAPL");
        assert_eq!(asset.rationale, vec!["r1", "r2"]);
        assert!(asset.technical_analysis.is_none());
    }

    #[test]
    fn parse_analysis_discriminates_channel_variant() {
        let text = json!({
            "channelName": "Some Channel",
            "overallStance": "Cautiously bullish",
            "keyThemes": ["rates"],
            "recentVideosSummary": [{"title": "Ep 1", "summary": "s"}],
        })
        .to_string();
        let analysis = parse_analysis(&text).unwrap();
        let channel = analysis.as_channel().unwrap();
        assert_eq!(channel.channel_name, "Some Channel");
        assert_eq!(channel.recent_videos_summary[0].title, "Ep 1");
    }

    #[test]
    fn parse_analysis_rejects_object_without_discriminator() {
        let err = parse_analysis(r#"{"suggestion":"Buy"}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse { .. }));
    }

    #[test]
    fn parse_analysis_rejects_invalid_json() {
        let err = parse_analysis("Sorry, I cannot help with that.").unwrap_err();
        match err {
            AnalysisError::MalformedResponse { detail, raw_text } => {
                assert!(detail.starts_with("response is not valid JSON"));
                assert_eq!(raw_text, "Sorry, I cannot help with that.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_analysis_rejects_non_object_json() {
        assert!(matches!(
            parse_analysis("[1,2,3]"),
            Err(AnalysisError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn parse_analysis_tolerates_missing_and_null_nested_fields() {
        let text = json!({
            "symbol": "GOLD",
            "suggestion": null,
            "technicalAnalysis": {"summary": "Range bound"},
        })
        .to_string();
        let analysis = parse_analysis(&text).unwrap();
        let asset = analysis.as_asset().unwrap();
        assert_eq!(asset.suggestion, "");
        assert!(asset.rationale.is_empty());
        let ta = asset.technical_analysis.as_ref().unwrap();
        assert_eq!(ta.summary, "Range bound");
        assert!(ta.patterns.is_empty());
    }

    #[test]
    fn extract_sources_keeps_only_citations_with_uri() {
        let chunks: Vec<CitationChunk> = serde_json::from_value(json!([
            {"web": {"uri": "", "title": "x"}},
            {"web": {"uri": "http://a", "title": "A"}},
            {},
        ]))
        .unwrap();

        let sources = extract_sources(&chunks);
        assert_eq!(
            sources,
            vec![Source {
                uri: "http://a".to_string(),
                title: Some("A".to_string()),
            }]
        );
    }

    #[test]
    fn extract_sources_preserves_order_duplicates_and_missing_titles() {
        let chunks: Vec<CitationChunk> = serde_json::from_value(json!([
            {"web": {"uri": "http://b"}},
            {"web": {"uri": "http://a", "title": "A"}},
            {"web": {"uri": "http://b"}},
        ]))
        .unwrap();

        let sources = extract_sources(&chunks);
        let uris: Vec<_> = sources.iter().map(|s| s.uri.as_str()).collect();
        assert_eq!(uris, vec!["http://b", "http://a", "http://b"]);
        assert_eq!(sources[0].title, None);
    }

    #[test]
    fn parse_analysis_accepts_wrongly_typed_nested_fields() {
        let gold = json!({
            "symbol": "GOLD",
            "suggestion": "Hold",
            "rationale": ["Safe haven demand"],
            "technicalAnalysis": "Not available for commodities",
        })
        .to_string();
        let analysis = parse_analysis(&gold).unwrap();
        assert!(analysis.as_asset().unwrap().technical_analysis.is_none());

        let aapl = r#"{"symbol":"AAPL","suggestion":"Buy","rationale":"One single reason"}"#;
        let analysis = parse_analysis(aapl).unwrap();
        assert_eq!(analysis.as_asset().unwrap().rationale, vec!["One single reason"]);

        let chan = r#"{"channelName":"Chan","overallStance":"Neutral","keyThemes":"rates"}"#;
        let analysis = parse_analysis(chan).unwrap();
        assert_eq!(analysis.as_channel().unwrap().key_themes, vec!["rates"]);
    }

    #[test]
    fn parse_analysis_accepts_non_string_discriminator_values() {
        let analysis = parse_analysis(r#"{"symbol":null}"#).unwrap();
        assert_eq!(analysis.as_asset().unwrap().symbol, "");
    }

    #[test]
    fn parse_analysis_prefers_symbol_when_both_discriminators_present() {
        let analysis = parse_analysis(r#"{"symbol":"AAPL","channelName":"X"}"#).unwrap();
        assert_eq!(analysis.as_asset().unwrap().symbol, "AAPL");
        assert!(analysis.as_channel().is_none());
    }
}
