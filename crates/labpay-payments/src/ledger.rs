//! Processed Event Ledger
//!
//! The processor delivers settlement events at least once, so the same event
//! id can arrive again after a forward that already succeeded. The ledger
//! records confirmed forwards for a bounded window, turning at-least-once
//! delivery into effectively-once for the common redelivery case. Entries
//! are marked only after a confirmed downstream success; a failed forward
//! leaves the id unmarked so the processor's retry goes through again.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Record of settlement events already forwarded downstream.
#[async_trait]
pub trait EventLedger: Send + Sync {
    async fn is_processed(&self, event_id: &str) -> bool;
    async fn mark_processed(&self, event_id: &str);
}

/// In-memory ledger with bounded retention.
pub struct MemoryEventLedger {
    retention: Duration,
    processed: RwLock<HashMap<String, Instant>>,
}

impl MemoryEventLedger {
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            processed: RwLock::new(HashMap::new()),
        }
    }

    /// One hour: the signature replay window times a safety factor of 12,
    /// comfortably past the processor's redelivery backoff schedule.
    pub fn with_default_retention() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

#[async_trait]
impl EventLedger for MemoryEventLedger {
    async fn is_processed(&self, event_id: &str) -> bool {
        let processed = self.processed.read().unwrap();
        matches!(processed.get(event_id), Some(expires) if *expires > Instant::now())
    }

    async fn mark_processed(&self, event_id: &str) {
        let now = Instant::now();
        let mut processed = self.processed.write().unwrap();
        processed.retain(|_, expires| *expires > now);
        processed.insert(event_id.to_string(), now + self.retention);
    }
}
