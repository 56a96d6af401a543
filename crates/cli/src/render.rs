use std::fmt::Write;
use stockscope_core::domain::analysis::{Analysis, AnalysisResult, FullAnalysis, YoutubeAnalysis};
use stockscope_core::domain::note::ExpertNote;

pub fn render_analysis(full: &FullAnalysis) -> String {
    let mut out = String::new();
    match &full.analysis {
        Analysis::Asset(asset) => render_asset(&mut out, asset),
        Analysis::Channel(channel) => render_channel(&mut out, channel),
    }

    if !full.sources.is_empty() {
        out.push_str("\nSources\n");
        for (i, source) in full.sources.iter().enumerate() {
            let _ = writeln!(out, "  [{}] {} <{}>", i + 1, source.display_title(), source.uri);
        }
    }
    out
}

fn render_asset(out: &mut String, asset: &AnalysisResult) {
    let _ = writeln!(out, "{}", asset.symbol);
    let _ = writeln!(out, "Suggestion: {}", asset.suggestion);

    if !asset.rationale.is_empty() {
        out.push_str("\nRationale\n");
        for line in &asset.rationale {
            let _ = writeln!(out, "  - {line}");
        }
    }

    if let Some(ta) = &asset.technical_analysis {
        out.push_str("\nTechnical analysis\n");
        if !ta.summary.is_empty() {
            let _ = writeln!(out, "  {}", ta.summary);
        }
        for pattern in &ta.patterns {
            let _ = writeln!(out, "  * {}: {}", pattern.name, pattern.description);
        }
    }
}

fn render_channel(out: &mut String, channel: &YoutubeAnalysis) {
    let _ = writeln!(out, "{}", channel.channel_name);
    let _ = writeln!(out, "Overall stance: {}", channel.overall_stance);

    if !channel.key_themes.is_empty() {
        out.push_str("\nKey themes\n");
        for theme in &channel.key_themes {
            let _ = writeln!(out, "  - {theme}");
        }
    }

    if !channel.recent_videos_summary.is_empty() {
        out.push_str("\nRecent videos\n");
        for video in &channel.recent_videos_summary {
            let _ = writeln!(out, "  * {}: {}", video.title, video.summary);
        }
    }
}

pub fn render_notes(notes: &[ExpertNote]) -> String {
    if notes.is_empty() {
        return "No opinions saved for this stock yet.\n".to_string();
    }

    let mut out = String::new();
    for note in notes {
        let _ = writeln!(
            out,
            "{}  {}  ({})",
            note.id,
            note.person,
            note.timestamp.format("%Y-%m-%d %H:%M UTC")
        );
        for line in note.opinion.lines() {
            let _ = writeln!(out, "    {line}");
        }
    }
    out
}
