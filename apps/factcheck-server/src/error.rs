//! Error types for the fact-check server
//!
//! Every failure leaves the server as JSON with an explicit `error` field;
//! nothing here ever renders as a verdict.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// Why `verify` produced no verdict
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("Missing claim")]
    InvalidInput,

    #[error("Server misconfigured: {0}")]
    Misconfigured(String),

    #[error("Evidence engine error (status {status:?}): {details}")]
    UpstreamError { status: Option<u16>, details: String },

    #[error("Could not parse structured JSON from evidence engine response")]
    ExtractionFailed { raw: Value },
}

impl VerificationError {
    /// Stable tag used in the `error` field
    pub fn tag(&self) -> &'static str {
        match self {
            VerificationError::InvalidInput => "Missing claim",
            VerificationError::Misconfigured(_) => "Misconfigured",
            VerificationError::UpstreamError { .. } => "UpstreamError",
            VerificationError::ExtractionFailed { .. } => "ExtractionFailed",
        }
    }
}

impl IntoResponse for VerificationError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            VerificationError::InvalidInput => {
                (StatusCode::BAD_REQUEST, json!({ "error": self.tag() }))
            }
            VerificationError::Misconfigured(details) => {
                tracing::error!("Misconfigured: {}", details);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": self.tag(), "details": details }),
                )
            }
            VerificationError::UpstreamError { status, details } => {
                tracing::warn!("Evidence engine error: status={:?}", status);
                (
                    StatusCode::BAD_GATEWAY,
                    json!({ "error": self.tag(), "status": status, "details": details }),
                )
            }
            VerificationError::ExtractionFailed { raw } => (
                StatusCode::BAD_GATEWAY,
                json!({
                    "error": self.tag(),
                    "details": self.to_string(),
                    "raw": raw,
                }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Errors from the HTTP surface as a whole
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error("Missing claim")]
    MissingClaim,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Verification(err) => err.into_response(),
            ApiError::MissingClaim => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Missing claim" })),
            )
                .into_response(),
            ApiError::InvalidBody(details) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid request body", "details": details })),
            )
                .into_response(),
        }
    }
}
