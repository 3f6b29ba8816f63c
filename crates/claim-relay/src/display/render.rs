//! Presentation helpers for the panel: what the user actually reads

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{Source, VerificationResult};

/// Coarse phase shown by the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Checking,
    Result,
    Error,
}

/// Styling cue for the verdict pill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictTone {
    Supported,
    Refuted,
    Mixed,
    Neutral,
}

impl VerdictTone {
    /// Keyword match on the lowercased label, in priority order
    pub fn classify(label: &str) -> Self {
        let label = label.to_lowercase();
        let has_any = |keys: &[&str]| keys.iter().any(|k| label.contains(k));

        if has_any(&["true", "accurate", "supported"]) {
            VerdictTone::Supported
        } else if has_any(&["false", "fabricated", "hoax"]) {
            VerdictTone::Refuted
        } else if has_any(&["misleading", "missing context", "partly"]) {
            VerdictTone::Mixed
        } else {
            VerdictTone::Neutral
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedSource {
    pub href: String,
    pub label: String,
    pub tail: String,
}

impl From<&Source> for RenderedSource {
    fn from(source: &Source) -> Self {
        let label = source
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| source.url.clone());

        let mut tail = String::new();
        if let Some(publisher) = source.publisher.as_deref().filter(|p| !p.is_empty()) {
            tail.push_str(" — ");
            tail.push_str(publisher);
        }
        if let Some(date) = source.date.as_deref().filter(|d| !d.is_empty()) {
            tail.push_str(&format!(" ({})", date));
        }

        RenderedSource {
            href: source.url.clone(),
            label,
            tail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedResult {
    pub verdict: String,
    pub tone: VerdictTone,
    pub confidence_line: String,
    pub explanation: String,
    pub sources: Vec<RenderedSource>,
}

impl From<&VerificationResult> for RenderedResult {
    fn from(result: &VerificationResult) -> Self {
        let verdict = result.verdict.as_str().to_string();
        let confidence_line = match result.confidence {
            Some(c) => format!("Confidence: {}", c),
            None => "Confidence: —".to_string(),
        };
        let explanation = if result.explanation.trim().is_empty() {
            "(No explanation returned.)".to_string()
        } else {
            result.explanation.clone()
        };

        RenderedResult {
            tone: VerdictTone::classify(&verdict),
            verdict,
            confidence_line,
            explanation,
            sources: result.sources.iter().map(RenderedSource::from).collect(),
        }
    }
}

/// Everything the panel draws, as one immutable snapshot
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SurfaceView {
    pub phase: Phase,
    pub input: String,
    pub meta_line: String,
    pub status: Option<String>,
    pub result: Option<RenderedResult>,
}

/// `From: <url> • Captured: <time>`, omitting whichever part is missing
pub fn meta_line(url: Option<&str>, captured_at: Option<DateTime<Utc>>) -> String {
    let mut bits = Vec::new();
    if let Some(url) = url {
        bits.push(format!("From: {}", url));
    }
    if let Some(at) = captured_at {
        bits.push(format!("Captured: {}", at.format("%Y-%m-%d %H:%M:%S UTC")));
    }
    bits.join(" • ")
}
