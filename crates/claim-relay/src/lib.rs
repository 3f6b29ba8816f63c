//! Claim relay pipeline
//!
//! Client-side half of the highlight fact checker:
//!
//! - [`SessionStore`]: the single "current claim" record, last writer wins
//! - [`SelectionTrigger`] / [`ManualTrigger`]: entry points producing claims
//! - [`RelayChannel`] / [`ClaimRelay`]: write-then-publish push path
//! - [`DisplaySurface`]: the panel state machine, driven by [`SurfaceRuntime`]
//! - [`Verifier`] / [`HttpVerifier`]: the call into the verification backend
//!
//! The data model in [`types`] is shared with the backend so both sides agree
//! on the JSON shape of a verdict.

pub mod client;
pub mod display;
pub mod relay;
pub mod session;
pub mod trigger;
pub mod types;

pub use client::{CheckError, HttpVerifier, Verifier};
pub use display::{
    CheckTicket, DisplaySurface, Phase, SurfaceCommand, SurfaceError, SurfaceHandle,
    SurfaceRuntime, SurfaceState, SurfaceView, VerdictTone,
};
pub use relay::{ClaimRelay, RelayChannel, RelayEvent};
pub use session::{SessionStore, StoredClaim};
pub use trigger::{CandidateClaim, ManualTrigger, SelectionTrigger, TriggerKind, TriggerSource};
pub use types::{
    ClaimRecord, Confidence, Diagnostics, Source, Verdict, VerificationRequest,
    VerificationResult,
};
