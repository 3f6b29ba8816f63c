//! Session-scoped store for the current claim
//!
//! Holds at most one [`ClaimRecord`]. Every component that needs it gets a
//! cloned handle; clones share the same slot. The store never notifies
//! anyone; callers that write are responsible for publishing.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::types::ClaimRecord;

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    slot: Arc<RwLock<Option<ClaimRecord>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current record
    pub async fn write(&self, record: ClaimRecord) {
        let mut slot = self.slot.write().await;
        debug!(claim_len = record.text().len(), "session store write");
        *slot = Some(record);
    }

    pub async fn read(&self) -> Option<ClaimRecord> {
        self.slot.read().await.clone()
    }

    /// Remove the current record. Clearing an empty store is a no-op.
    pub async fn clear(&self) {
        let mut slot = self.slot.write().await;
        if slot.take().is_some() {
            debug!("session store cleared");
        }
    }

    /// Current contents in key/value form
    pub async fn snapshot(&self) -> StoredClaim {
        StoredClaim::from(self.read().await.as_ref())
    }
}

/// Key/value view of the store: `lastClaim`, `lastUrl`, `lastUpdatedAt`.
///
/// `lastUpdatedAt` is milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredClaim {
    #[serde(default)]
    pub last_claim: Option<String>,
    #[serde(default)]
    pub last_url: Option<String>,
    #[serde(default)]
    pub last_updated_at: Option<i64>,
}

impl StoredClaim {
    /// Convert back into a record. Blank claims yield `None`; a missing or
    /// out-of-range timestamp falls back to now.
    pub fn into_record(self) -> Option<ClaimRecord> {
        let captured_at = self
            .last_updated_at
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now);
        ClaimRecord::capture_at(self.last_claim.as_deref()?, self.last_url, captured_at)
    }
}

impl From<Option<&ClaimRecord>> for StoredClaim {
    fn from(record: Option<&ClaimRecord>) -> Self {
        match record {
            Some(r) => StoredClaim {
                last_claim: Some(r.text().to_string()),
                last_url: r.origin_url().map(str::to_string),
                last_updated_at: Some(epoch_millis(r.captured_at())),
            },
            None => StoredClaim::default(),
        }
    }
}

fn epoch_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}
