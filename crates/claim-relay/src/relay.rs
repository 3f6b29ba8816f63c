//! Push path from triggers to display surfaces
//!
//! [`ClaimRelay::fire`] writes the session store first and publishes second.
//! A surface that activates concurrently therefore sees a record at least as
//! recent as any push it missed. Pushes are best-effort: with no subscriber
//! the message is dropped and the store is the only copy.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::session::SessionStore;
use crate::trigger::TriggerSource;
use crate::types::ClaimRecord;

/// Default number of pushes a slow subscriber may fall behind before lagging
pub const DEFAULT_RELAY_CAPACITY: usize = 32;

/// Message pushed to active surfaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelayEvent {
    #[serde(rename = "NEW_CLAIM")]
    NewClaim { claim: String, url: Option<String> },
}

impl RelayEvent {
    pub fn new_claim(record: &ClaimRecord) -> Self {
        RelayEvent::NewClaim {
            claim: record.text().to_string(),
            url: record.origin_url().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayChannel {
    tx: broadcast::Sender<RelayEvent>,
}

impl Default for RelayChannel {
    fn default() -> Self {
        Self::new(DEFAULT_RELAY_CAPACITY)
    }
}

impl RelayChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.tx.subscribe()
    }

    /// Broadcast a claim to every current subscriber.
    ///
    /// Returns how many subscribers received it; zero means it was dropped.
    pub fn publish(&self, claim: &str, url: Option<&str>) -> usize {
        let event = RelayEvent::NewClaim {
            claim: claim.to_string(),
            url: url.map(str::to_string),
        };
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => {
                debug!("no active surface, push dropped");
                0
            }
        }
    }

    pub fn listeners(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Session store and relay channel behind one triggering operation
#[derive(Debug, Clone, Default)]
pub struct ClaimRelay {
    store: SessionStore,
    channel: RelayChannel,
}

impl ClaimRelay {
    pub fn new(store: SessionStore, channel: RelayChannel) -> Self {
        Self { store, channel }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn channel(&self) -> &RelayChannel {
        &self.channel
    }

    /// Handle one trigger event.
    ///
    /// Blank claims are discarded without touching the store or the channel.
    /// Otherwise the record is stored, then published. Does not wait for any
    /// verification.
    pub async fn fire<T: TriggerSource + ?Sized>(&self, trigger: &T) -> Option<ClaimRecord> {
        let candidate = trigger.candidate();
        let Some(record) = ClaimRecord::capture(&candidate.text, candidate.origin_url) else {
            debug!(kind = %trigger.kind(), "blank claim discarded");
            return None;
        };

        self.store.write(record.clone()).await;
        let delivered = self.channel.publish(record.text(), record.origin_url());

        info!(
            kind = %trigger.kind(),
            delivered,
            "claim relayed"
        );

        Some(record)
    }
}
