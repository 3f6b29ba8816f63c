//! Reading a verdict out of a loosely structured engine envelope
//!
//! The envelope's `output` array mixes tool invocations, provenance records
//! and message records in no fixed order. Each item is classified into an
//! [`EnvelopeItem`]; the verdict comes from the text of the first message
//! that has any. Unknown shapes are kept as `Other`, never an error.

use claim_relay::{Confidence, Diagnostics, Source, Verdict, VerificationResult};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeItem {
    Message(Vec<ContentPart>),
    ToolCall(Value),
    Other,
}

impl EnvelopeItem {
    pub fn classify(item: &Value) -> Self {
        match item.get("type").and_then(Value::as_str) {
            Some("message") => EnvelopeItem::Message(content_parts(item.get("content"))),
            Some(kind) if kind.ends_with("_call") => EnvelopeItem::ToolCall(item.clone()),
            _ => EnvelopeItem::Other,
        }
    }
}

fn content_parts(content: Option<&Value>) -> Vec<ContentPart> {
    match content {
        Some(Value::String(text)) => vec![ContentPart::Text(text.clone())],
        Some(Value::Array(parts)) => parts.iter().map(content_part).collect(),
        _ => Vec::new(),
    }
}

fn content_part(part: &Value) -> ContentPart {
    let kind = part.get("type").and_then(Value::as_str);
    match (kind, part.get("text")) {
        (Some("output_text") | Some("text"), Some(Value::String(text))) => {
            ContentPart::Text(text.clone())
        }
        _ => ContentPart::Other,
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Envelope {
    pub id: Option<String>,
    pub model: Option<String>,
    pub usage: Option<Value>,
    pub items: Vec<EnvelopeItem>,
}

impl Envelope {
    pub fn parse(raw: &Value) -> Self {
        let text_field = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);

        Envelope {
            id: text_field("id"),
            model: text_field("model"),
            usage: raw.get("usage").filter(|u| !u.is_null()).cloned(),
            items: raw
                .get("output")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(EnvelopeItem::classify).collect())
                .unwrap_or_default(),
        }
    }

    /// Text of the first message item that has a text part
    pub fn first_message_text(&self) -> Option<&str> {
        self.items.iter().find_map(|item| match item {
            EnvelopeItem::Message(parts) => parts.iter().find_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::Other => None,
            }),
            _ => None,
        })
    }

    pub fn tool_calls(&self) -> Vec<Value> {
        self.items
            .iter()
            .filter_map(|item| match item {
                EnvelopeItem::ToolCall(call) => Some(call.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            response_id: self.id.clone(),
            model: self.model.clone(),
            usage: self.usage.clone(),
            tool_sources: self.tool_calls(),
        }
    }
}

/// Map a structured payload onto the closed vocabulary.
///
/// Returns `None` when the payload is not a JSON object. Unknown verdicts
/// become `Unclear`, unknown confidences are dropped, sources without a URL
/// are skipped.
pub fn normalize_payload(payload: &Value) -> Option<VerificationResult> {
    let fields = payload.as_object()?;

    let verdict = string_field(fields, "verdict")
        .map(Verdict::coerce)
        .unwrap_or(Verdict::Unclear);
    let confidence = string_field(fields, "confidence").and_then(Confidence::from_label);
    let explanation = string_field(fields, "explanation")
        .unwrap_or_default()
        .to_string();
    let sources = fields
        .get("sources")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(source_entry).collect())
        .unwrap_or_default();

    Some(VerificationResult {
        verdict,
        confidence,
        explanation,
        sources,
        diagnostics: None,
    })
}

fn string_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn source_entry(entry: &Value) -> Option<Source> {
    match entry {
        Value::String(url) if !url.trim().is_empty() => Some(Source {
            title: None,
            url: url.trim().to_string(),
            publisher: None,
            date: None,
        }),
        Value::Object(fields) => Some(Source {
            url: string_field(fields, "url")?.to_string(),
            title: string_field(fields, "title").map(str::to_string),
            publisher: string_field(fields, "publisher").map(str::to_string),
            date: string_field(fields, "date").map(str::to_string),
        }),
        _ => None,
    }
}
