//! Claim entry points
//!
//! A trigger only produces a candidate; [`crate::ClaimRelay::fire`] does the
//! trimming, the store write and the push.

use serde::{Deserialize, Serialize};

/// Where a claim came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Highlighted text plus an explicit "fact-check this" action
    #[default]
    Selection,
    /// Text typed into the display surface
    Manual,
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerKind::Selection => write!(f, "selection"),
            TriggerKind::Manual => write!(f, "manual"),
        }
    }
}

/// Untrimmed claim text with an optional origin URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateClaim {
    pub text: String,
    pub origin_url: Option<String>,
}

pub trait TriggerSource: Send + Sync {
    fn kind(&self) -> TriggerKind;

    fn candidate(&self) -> CandidateClaim;
}

/// User marked text on a page and asked for a fact check
#[derive(Debug, Clone)]
pub struct SelectionTrigger {
    pub selection_text: String,
    pub page_url: Option<String>,
}

impl SelectionTrigger {
    pub fn new(selection_text: impl Into<String>, page_url: Option<String>) -> Self {
        Self {
            selection_text: selection_text.into(),
            page_url,
        }
    }
}

impl TriggerSource for SelectionTrigger {
    fn kind(&self) -> TriggerKind {
        TriggerKind::Selection
    }

    fn candidate(&self) -> CandidateClaim {
        CandidateClaim {
            text: self.selection_text.clone(),
            origin_url: self.page_url.clone(),
        }
    }
}

/// User typed a claim and submitted it
#[derive(Debug, Clone)]
pub struct ManualTrigger {
    pub text: String,
    pub current_tab_url: Option<String>,
}

impl ManualTrigger {
    pub fn new(text: impl Into<String>, current_tab_url: Option<String>) -> Self {
        Self {
            text: text.into(),
            current_tab_url,
        }
    }
}

impl TriggerSource for ManualTrigger {
    fn kind(&self) -> TriggerKind {
        TriggerKind::Manual
    }

    fn candidate(&self) -> CandidateClaim {
        CandidateClaim {
            text: self.text.clone(),
            origin_url: self.current_tab_url.clone(),
        }
    }
}
