//! Claim and verdict data model shared by the relay and the backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// The single "current claim" held by the session store.
///
/// Only [`ClaimRecord::capture`] builds one, so `text` is always trimmed and
/// non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    text: String,
    origin_url: Option<String>,
    captured_at: DateTime<Utc>,
}

impl ClaimRecord {
    /// Capture a claim now. Returns `None` when the trimmed text is empty.
    pub fn capture(text: &str, origin_url: Option<String>) -> Option<Self> {
        Self::capture_at(text, origin_url, Utc::now())
    }

    /// Capture a claim with an explicit timestamp
    pub fn capture_at(
        text: &str,
        origin_url: Option<String>,
        captured_at: DateTime<Utc>,
    ) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        Some(Self {
            text: text.to_string(),
            origin_url: normalize_url(origin_url),
            captured_at,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin_url(&self) -> Option<&str> {
        self.origin_url.as_deref()
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Build the request a check of this claim sends to the backend
    pub fn to_request(&self) -> VerificationRequest {
        VerificationRequest {
            claim: self.text.clone(),
            origin_url: self.origin_url.clone(),
        }
    }
}

fn normalize_url(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

/// Body of `POST /factcheck`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VerificationRequest {
    #[serde(default)]
    pub claim: String,
    #[serde(rename = "url", default)]
    pub origin_url: Option<String>,
}

impl VerificationRequest {
    pub fn new(claim: impl Into<String>, origin_url: Option<String>) -> Self {
        Self {
            claim: claim.into(),
            origin_url,
        }
    }

    /// The claim with surrounding whitespace removed, or `None` if nothing is left
    pub fn trimmed_claim(&self) -> Option<&str> {
        let claim = self.claim.trim();
        (!claim.is_empty()).then_some(claim)
    }
}

/// Closed verdict vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Verdict {
    True,
    False,
    Misleading,
    Unclear,
}

impl Verdict {
    pub const ALL: [Verdict; 4] = [
        Verdict::True,
        Verdict::False,
        Verdict::Misleading,
        Verdict::Unclear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::True => "True",
            Verdict::False => "False",
            Verdict::Misleading => "Misleading",
            Verdict::Unclear => "Unclear",
        }
    }

    /// Exact (case-insensitive) match against the vocabulary
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(label))
    }

    /// Map any label onto the vocabulary; unknown labels become `Unclear`
    pub fn coerce(label: &str) -> Self {
        Self::from_label(label).unwrap_or(Verdict::Unclear)
    }
}

impl From<String> for Verdict {
    fn from(label: String) -> Self {
        Verdict::coerce(&label)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed confidence vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub const ALL: [Confidence; 3] = [Confidence::High, Confidence::Medium, Confidence::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(label))
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn lenient_confidence<'de, D>(deserializer: D) -> Result<Option<Confidence>, D::Error>
where
    D: Deserializer<'de>,
{
    let label: Option<String> = Option::deserialize(deserializer)?;
    Ok(label.as_deref().and_then(Confidence::from_label))
}

/// A cited source. `url` is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Non-authoritative provenance attached to a verdict.
///
/// Serialized under the `raw` key. Nothing that decides a verdict reads it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    #[serde(default)]
    pub response_id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub usage: Option<serde_json::Value>,
    #[serde(default)]
    pub tool_sources: Vec<serde_json::Value>,
}

/// Structured verdict for one claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub verdict: Verdict,
    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: Option<Confidence>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(rename = "raw", default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}
