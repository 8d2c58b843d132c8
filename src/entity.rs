use serde::{Deserialize, Serialize};

use crate::event::{CapturedEvent, DomainEvent};

/// Identity, version, and event-capture bookkeeping for an aggregate.
///
/// Aggregates embed an `Entity` and raise events from their mutating methods.
/// The capture buffer is append-only from the aggregate's point of view: it
/// can be read in order via [`raised`](Entity::raised), but only the store's
/// commit path clears it, and only after the records are durably appended.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Entity {
    id: String,
    version: u64,
    #[serde(skip, default)]
    raised: Vec<CapturedEvent>,
}

impl Entity {
    pub fn new() -> Self {
        Entity::default()
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        let mut entity = Entity::default();
        entity.id = id.into();
        entity
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Record that something happened. Call order is preserved and becomes
    /// the delivery order within the committing transaction.
    pub fn raise<E: DomainEvent + 'static>(&mut self, event: E) {
        self.raised.push(CapturedEvent::new(Box::new(event)));
    }

    /// The events raised since the last successful commit, in raise order.
    pub fn raised(&self) -> &[CapturedEvent] {
        &self.raised
    }

    pub fn raised_len(&self) -> usize {
        self.raised.len()
    }

    pub(crate) fn clear_raised(&mut self) {
        self.raised.clear();
    }
}
