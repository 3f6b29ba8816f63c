//! Display surface state machine
//!
//! ```text
//! IDLE -> LOADING -> CHECKING -> RESULT | ERROR
//!                       ^            |
//!                       +------------+  new check / push
//! ```
//!
//! Every check gets a token from a monotonically increasing counter. A
//! completion only lands if its token is still the latest one; anything
//! older was superseded and is dropped. Clearing bumps the counter too.

mod render;
mod runtime;

pub use render::{meta_line, Phase, RenderedResult, RenderedSource, SurfaceView, VerdictTone};
pub use runtime::{SurfaceCommand, SurfaceHandle, SurfaceRuntime};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::CheckError;
use crate::relay::RelayEvent;
use crate::session::SessionStore;
use crate::types::{ClaimRecord, VerificationRequest, VerificationResult};

pub const CHECKING_STATUS: &str = "Checking…";

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceState {
    Idle,
    Loading,
    Checking { token: u64 },
    Result(VerificationResult),
    Error(String),
}

impl SurfaceState {
    pub fn phase(&self) -> Phase {
        match self {
            SurfaceState::Idle => Phase::Idle,
            SurfaceState::Loading => Phase::Loading,
            SurfaceState::Checking { .. } => Phase::Checking,
            SurfaceState::Result(_) => Phase::Result,
            SurfaceState::Error(_) => Phase::Error,
        }
    }
}

/// Local validation failure; never reaches the network
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("Please enter or highlight a claim first.")]
    EmptyClaim,
}

/// A check the surface has committed to. The caller runs `request` through a
/// verifier and reports back with [`DisplaySurface::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTicket {
    pub token: u64,
    pub request: VerificationRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ClaimMeta {
    url: Option<String>,
    captured_at: Option<DateTime<Utc>>,
}

pub struct DisplaySurface {
    store: SessionStore,
    state: SurfaceState,
    input: String,
    meta: ClaimMeta,
    status: Option<String>,
    latest_token: u64,
}

impl DisplaySurface {
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            state: SurfaceState::Idle,
            input: String::new(),
            meta: ClaimMeta::default(),
            status: None,
            latest_token: 0,
        }
    }

    pub fn state(&self) -> &SurfaceState {
        &self.state
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// The verdict currently shown, only in the RESULT state
    pub fn result(&self) -> Option<&VerificationResult> {
        match &self.state {
            SurfaceState::Result(result) => Some(result),
            _ => None,
        }
    }

    /// Token of the most recently issued check
    pub fn latest_token(&self) -> u64 {
        self.latest_token
    }

    /// User edited the claim box
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Panel opened. Loads the stored claim and auto-runs it if the input is
    /// still blank.
    pub async fn activate(&mut self) -> Option<CheckTicket> {
        self.state = SurfaceState::Loading;

        match self.store.read().await {
            Some(record) if self.input.trim().is_empty() => {
                info!("resuming stored claim on activation");
                self.show_claim(&record);
                Some(self.start_check(record).await)
            }
            _ => {
                self.state = SurfaceState::Idle;
                None
            }
        }
    }

    /// Explicit "check" action. Uses `claim` if given, otherwise the input box.
    pub async fn check(
        &mut self,
        claim: Option<&str>,
        url: Option<String>,
    ) -> Result<CheckTicket, SurfaceError> {
        let text = claim.unwrap_or(self.input.as_str());
        let Some(record) = ClaimRecord::capture(text, url) else {
            self.status = Some(SurfaceError::EmptyClaim.to_string());
            return Err(SurfaceError::EmptyClaim);
        };

        self.meta = ClaimMeta {
            url: record.origin_url().map(str::to_string),
            captured_at: Some(record.captured_at()),
        };
        Ok(self.start_check(record).await)
    }

    /// A pushed claim always preempts whatever is on screen
    pub async fn on_push(&mut self, event: RelayEvent) -> Option<CheckTicket> {
        let RelayEvent::NewClaim { claim, url } = event;
        self.input = claim.clone();
        self.check(Some(claim.as_str()), url).await.ok()
    }

    /// Reload from the session store after missed pushes
    pub async fn reconcile(&mut self) -> Option<CheckTicket> {
        let record = self.store.read().await?;
        if record.text() == self.input.trim() && self.state != SurfaceState::Idle {
            return None;
        }

        self.show_claim(&record);
        Some(self.start_check(record).await)
    }

    /// Apply a verifier outcome. Returns `false` when the ticket was
    /// superseded and the outcome was dropped.
    pub fn complete(&mut self, token: u64, outcome: Result<VerificationResult, CheckError>) -> bool {
        if token != self.latest_token || self.state != (SurfaceState::Checking { token }) {
            debug!(token, latest = self.latest_token, "discarding superseded check");
            return false;
        }

        match outcome {
            Ok(result) => {
                info!(token, verdict = %result.verdict, "check completed");
                self.status = None;
                self.state = SurfaceState::Result(result);
            }
            Err(err) => {
                warn!(token, "check failed: {}", err);
                let message = err.to_string();
                self.status = Some(message.clone());
                self.state = SurfaceState::Error(message);
            }
        }
        true
    }

    /// Wipe input, result and the stored claim; in-flight checks are
    /// invalidated.
    pub async fn clear(&mut self) {
        self.latest_token += 1;
        self.input.clear();
        self.meta = ClaimMeta::default();
        self.status = None;
        self.state = SurfaceState::Idle;
        self.store.clear().await;
    }

    pub fn view(&self) -> SurfaceView {
        SurfaceView {
            phase: self.state.phase(),
            input: self.input.clone(),
            meta_line: meta_line(self.meta.url.as_deref(), self.meta.captured_at),
            status: self.status.clone(),
            result: self.result().map(RenderedResult::from),
        }
    }

    fn show_claim(&mut self, record: &ClaimRecord) {
        self.input = record.text().to_string();
        self.meta = ClaimMeta {
            url: record.origin_url().map(str::to_string),
            captured_at: Some(record.captured_at()),
        };
    }

    async fn start_check(&mut self, record: ClaimRecord) -> CheckTicket {
        self.latest_token += 1;
        let token = self.latest_token;
        let request = record.to_request();

        // Persist first so a reload of the panel resumes this claim.
        self.store.write(record).await;

        self.status = Some(CHECKING_STATUS.to_string());
        self.state = SurfaceState::Checking { token };
        debug!(token, "check issued");

        CheckTicket { token, request }
    }
}
