use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Durable record of a domain event awaiting at-least-once delivery.
///
/// Created only by the store's commit path, in the same atomic unit as the
/// business rows; mutated only by the publisher. `processed_at` is terminal
/// once set. A record whose retries are exhausted is stamped with `failed_at`
/// and excluded from normal fetches: quarantined, not deleted.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct OutboxRecord {
    pub id: u64,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: String,
    pub occurred_at: SystemTime,
    pub processed_at: Option<SystemTime>,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub failed_at: Option<SystemTime>,
}

impl OutboxRecord {
    pub fn is_delivered(&self) -> bool {
        self.processed_at.is_some()
    }

    pub fn is_quarantined(&self) -> bool {
        self.failed_at.is_some()
    }

    pub fn is_undelivered(&self) -> bool {
        !self.is_delivered() && !self.is_quarantined()
    }
}
