//! Fixed instructions and output schema sent to the evidence engine

use serde_json::{json, Value};

use crate::engine::EvidenceQuery;

pub const SCHEMA_NAME: &str = "fact_check_result";

/// Keeps the engine's search short and its answer machine-readable
pub const SYSTEM_INSTRUCTION: &str = "Fact-check quickly. Use at most 2 web sources. \
If evidence is not found within a short search, return Unclear. \
Do not keep searching. Output JSON only.";

pub fn user_instruction(claim: &str, origin_url: Option<&str>) -> String {
    let mut text = format!("Fact-check this claim:\n\"{}\"\n\n", claim);
    if let Some(url) = origin_url {
        text.push_str(&format!("Context URL (where user saw it): {}\n\n", url));
    }
    text.push_str("Return your answer in the required JSON format.");
    text
}

/// Output schema: closed vocabularies, required fields, open-ended sources
pub fn result_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "verdict": {
                "type": "string",
                "enum": ["True", "False", "Misleading", "Unclear"],
                "description": "One of: True, False, Misleading, Unclear"
            },
            "confidence": {
                "type": "string",
                "enum": ["High", "Medium", "Low"],
                "description": "One of: High, Medium, Low"
            },
            "explanation": {
                "type": "string",
                "description": "Short explanation (2-6 sentences), focused on what sources say."
            },
            "sources": {
                "type": "array",
                "description": "Cited sources used to reach the verdict. 2-6 sources ideally.",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "title": { "type": "string" },
                        "url": { "type": "string" },
                        "publisher": { "type": "string" },
                        "date": { "type": "string", "description": "YYYY-MM-DD if possible" }
                    },
                    "required": ["url"]
                }
            }
        },
        "required": ["verdict", "confidence", "explanation", "sources"]
    })
}

pub fn build_query(claim: &str, origin_url: Option<&str>) -> EvidenceQuery {
    EvidenceQuery {
        system: SYSTEM_INSTRUCTION.to_string(),
        user: user_instruction(claim, origin_url),
        schema_name: SCHEMA_NAME.to_string(),
        schema: result_schema(),
        store: false,
    }
}
