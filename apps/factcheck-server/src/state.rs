//! Application state for the fact-check server

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use claim_relay::ClaimRelay;
use tracing::{info, warn};

use crate::engine::{EngineConfig, EvidenceEngine, ResponsesEngine};
use crate::orchestrator::VerificationOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<VerificationOrchestrator>,
    /// Session store and push channel for out-of-process triggers and panels
    pub relay: ClaimRelay,
}

/// Engine settings as read from the command line / environment
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl AppState {
    pub fn new(orchestrator: VerificationOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            relay: ClaimRelay::default(),
        }
    }

    /// Build state from settings. A missing or placeholder API key is not
    /// fatal: the server starts and reports `Misconfigured` per request.
    pub fn from_settings(settings: EngineSettings) -> Result<Self> {
        let engine: Option<Arc<dyn EvidenceEngine>> = match settings.api_key {
            Some(key) if valid_api_key(&key) => {
                info!("Evidence engine: {} via {}", settings.model, settings.endpoint);
                let engine: Arc<dyn EvidenceEngine> =
                    Arc::new(ResponsesEngine::new(EngineConfig {
                        endpoint: settings.endpoint,
                        api_key: key.trim().to_string(),
                        model: settings.model,
                        timeout: settings.timeout,
                    })?);
                Some(engine)
            }
            _ => {
                warn!("No usable OPENAI_API_KEY; /factcheck will answer Misconfigured");
                None
            }
        };

        Ok(Self::new(VerificationOrchestrator::new(engine)))
    }
}

/// Rejects empty keys and copy-pasted placeholders like `sk-...`
pub fn valid_api_key(key: &str) -> bool {
    let trimmed = key.trim();
    !trimmed.is_empty() && !trimmed.contains("...")
}
