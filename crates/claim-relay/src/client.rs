//! Calls from a display surface into the verification backend

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::types::{VerificationRequest, VerificationResult};

/// Default timeout for one `POST /factcheck` round trip
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(120);

/// Why a check produced no verdict. The `Display` text is what the surface
/// shows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error ({status}): {body}")]
    Backend { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationResult, CheckError>;
}

/// [`Verifier`] over HTTP against a running fact-check server
pub struct HttpVerifier {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpVerifier {
    /// `base_url` is the server root, e.g. `http://localhost:8787`
    pub fn new(base_url: &str) -> Result<Self, CheckError> {
        Self::with_timeout(base_url, DEFAULT_CHECK_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, CheckError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CheckError::Network(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/factcheck", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl Verifier for HttpVerifier {
    async fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationResult, CheckError> {
        debug!("POST {}", self.endpoint);

        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| CheckError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CheckError::Network(e.to_string()))?;

        if !status.is_success() {
            let body = if body.is_empty() {
                status.canonical_reason().unwrap_or_default().to_string()
            } else {
                body
            };
            return Err(CheckError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| CheckError::Malformed(e.to_string()))
    }
}
