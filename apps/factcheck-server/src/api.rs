//! HTTP handlers for the fact-check server
//!
//! Provides REST endpoints for:
//! - Health checks
//! - Claim verification
//! - The claim relay (trigger, session state, push stream)

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
    routing::{get, post},
    Json, Router,
};
use claim_relay::{
    ManualTrigger, SelectionTrigger, StoredClaim, TriggerKind, VerificationRequest,
    VerificationResult,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

/// Largest accepted JSON body
pub const BODY_LIMIT_BYTES: usize = 200 * 1024;

/// Full router with middleware
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handle_health))
        // Verification
        .route("/factcheck", post(handle_factcheck))
        // Claim relay
        .route("/claims", post(handle_fire_claim))
        .route(
            "/session",
            get(handle_get_session)
                .put(handle_put_session)
                .delete(handle_delete_session),
        )
        .route("/events", get(handle_events))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES)),
        )
        .with_state(state)
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// Unwrap a JSON body. A request with no JSON body at all counts as one
/// without a claim; a JSON body that fails to parse is `InvalidBody`.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(JsonRejection::MissingJsonContentType(_)) => Err(ApiError::MissingClaim),
        Err(rejection) => Err(ApiError::InvalidBody(rejection.body_text())),
    }
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// Handler: POST /factcheck
pub async fn handle_factcheck(
    State(state): State<AppState>,
    body: Result<Json<VerificationRequest>, JsonRejection>,
) -> Result<Json<VerificationResult>, ApiError> {
    let request = json_body(body)?;
    let result = state.orchestrator.verify(&request).await?;
    Ok(Json(result))
}

/// Trigger request body
#[derive(Debug, Deserialize)]
pub struct FireClaimRequest {
    #[serde(default)]
    pub claim: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source: TriggerKind,
}

#[derive(Debug, Serialize)]
pub struct FireClaimResponse {
    pub accepted: bool,
}

/// Handler: POST /claims
///
/// Stores the claim, then pushes it to every open `/events` stream.
pub async fn handle_fire_claim(
    State(state): State<AppState>,
    body: Result<Json<FireClaimRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FireClaimResponse>), ApiError> {
    let req = json_body(body)?;

    let fired = match req.source {
        TriggerKind::Selection => {
            state
                .relay
                .fire(&SelectionTrigger::new(req.claim, req.url))
                .await
        }
        TriggerKind::Manual => {
            state
                .relay
                .fire(&ManualTrigger::new(req.claim, req.url))
                .await
        }
    };

    fired.ok_or(ApiError::MissingClaim)?;
    Ok((StatusCode::ACCEPTED, Json(FireClaimResponse { accepted: true })))
}

/// Handler: GET /session
pub async fn handle_get_session(State(state): State<AppState>) -> Json<StoredClaim> {
    Json(state.relay.store().snapshot().await)
}

/// Handler: PUT /session
///
/// Plain store write; does not push.
pub async fn handle_put_session(
    State(state): State<AppState>,
    body: Result<Json<StoredClaim>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let stored = json_body(body)?;
    let record = stored.into_record().ok_or(ApiError::MissingClaim)?;
    state.relay.store().write(record).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler: DELETE /session
pub async fn handle_delete_session(State(state): State<AppState>) -> StatusCode {
    state.relay.store().clear().await;
    StatusCode::NO_CONTENT
}

/// Handler: GET /events
///
/// One `NEW_CLAIM` event per relayed claim. Pushes missed while the stream
/// lags are skipped; `/session` still has the latest claim.
pub async fn handle_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(
        "Panel subscribed to relay ({} already listening)",
        state.relay.channel().listeners()
    );

    let stream = BroadcastStream::new(state.relay.channel().subscribe()).filter_map(|msg| {
        let event = msg.ok()?;
        match Event::default().event("NEW_CLAIM").json_data(&event) {
            Ok(sse) => Some(Ok(sse)),
            Err(e) => {
                debug!("dropping unserializable relay event: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
