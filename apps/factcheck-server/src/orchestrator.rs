//! Claim to verdict: validate, ask the evidence engine, extract

use std::sync::Arc;

use claim_relay::{VerificationRequest, VerificationResult};
use serde_json::Value;
use tracing::{info, warn};

use crate::engine::{EngineError, EvidenceEngine};
use crate::error::VerificationError;
use crate::extract::{normalize_payload, Envelope};
use crate::prompt::build_query;

pub struct VerificationOrchestrator {
    engine: Option<Arc<dyn EvidenceEngine>>,
}

impl VerificationOrchestrator {
    /// `None` leaves the orchestrator misconfigured: every non-empty claim
    /// fails with [`VerificationError::Misconfigured`].
    pub fn new(engine: Option<Arc<dyn EvidenceEngine>>) -> Self {
        Self { engine }
    }

    pub fn is_configured(&self) -> bool {
        self.engine.is_some()
    }

    pub async fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationResult, VerificationError> {
        let claim = request
            .trimmed_claim()
            .ok_or(VerificationError::InvalidInput)?;

        let engine = self.engine.as_ref().ok_or_else(|| {
            VerificationError::Misconfigured(
                "No evidence engine credential configured. Set OPENAI_API_KEY and restart."
                    .to_string(),
            )
        })?;

        let origin_url = request
            .origin_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());
        let query = build_query(claim, origin_url);

        info!(engine = engine.name(), claim_len = claim.len(), "verifying claim");

        let reply = engine.query(&query).await.map_err(|e| {
            warn!("evidence engine call failed: {}", e);
            VerificationError::UpstreamError {
                status: None,
                details: match e {
                    EngineError::Transport(msg) => msg,
                    timeout @ EngineError::Timeout(_) => timeout.to_string(),
                },
            }
        })?;

        if !reply.is_success() {
            return Err(VerificationError::UpstreamError {
                status: Some(reply.status),
                details: reply.body,
            });
        }

        let raw: Value = match serde_json::from_str(&reply.body) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("evidence engine body is not JSON: {}", e);
                return Err(VerificationError::ExtractionFailed {
                    raw: Value::String(reply.body),
                });
            }
        };

        let envelope = Envelope::parse(&raw);
        let mut result = envelope
            .first_message_text()
            .and_then(|text| serde_json::from_str::<Value>(text).ok())
            .and_then(|payload| normalize_payload(&payload))
            .ok_or_else(|| {
                warn!(
                    items = envelope.items.len(),
                    "no structured payload in engine response"
                );
                VerificationError::ExtractionFailed { raw: raw.clone() }
            })?;

        result.diagnostics = Some(envelope.diagnostics());

        info!(verdict = %result.verdict, sources = result.sources.len(), "claim verified");
        Ok(result)
    }
}
