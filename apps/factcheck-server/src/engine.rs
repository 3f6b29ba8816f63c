//! Evidence engine: the external web-search-capable model
//!
//! The orchestrator only sees [`EvidenceEngine`]: an instruction pair and a
//! schema go in, an HTTP status and raw body come out. [`ResponsesEngine`]
//! speaks a Responses-style JSON API over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

/// One evidence-gathering request
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceQuery {
    pub system: String,
    pub user: String,
    /// Name of the requested output schema
    pub schema_name: String,
    /// JSON schema the answer should follow
    pub schema: Value,
    /// Whether the provider may keep the exchange; always `false` here
    pub store: bool,
}

/// Raw engine answer, before any interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReply {
    pub status: u16,
    pub body: String,
}

impl EngineReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Evidence engine unreachable: {0}")]
    Transport(String),

    #[error("Evidence engine timed out after {0}s")]
    Timeout(u64),
}

#[async_trait]
pub trait EvidenceEngine: Send + Sync {
    /// Engine identifier for logs
    fn name(&self) -> &str;

    async fn query(&self, query: &EvidenceQuery) -> Result<EngineReply, EngineError>;
}

/// Connection settings for [`ResponsesEngine`]
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

pub struct ResponsesEngine {
    http: reqwest::Client,
    config: EngineConfig,
}

impl ResponsesEngine {
    pub fn new(config: EngineConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("factcheck-server/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, config })
    }

    /// Provider request body: instruction pair, web search tool, structured
    /// output format, tool provenance, storage directive.
    pub fn payload(&self, query: &EvidenceQuery) -> Value {
        json!({
            "model": self.config.model,
            "input": [
                { "role": "system", "content": query.system },
                { "role": "user", "content": query.user },
            ],
            "tools": [{ "type": "web_search" }],
            "text": {
                "format": {
                    "type": "json_schema",
                    "name": query.schema_name,
                    "strict": false,
                    "schema": query.schema,
                }
            },
            "include": ["web_search_call.action.sources"],
            "store": query.store,
        })
    }
}

#[async_trait]
impl EvidenceEngine for ResponsesEngine {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn query(&self, query: &EvidenceQuery) -> Result<EngineReply, EngineError> {
        debug!(model = %self.config.model, "querying evidence engine");

        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                EngineError::Timeout(self.config.timeout.as_secs())
            } else {
                EngineError::Transport(e.to_string())
            }
        };

        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&self.payload(query))
            .send()
            .await
            .map_err(map_err)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_err)?;

        Ok(EngineReply { status, body })
    }
}
