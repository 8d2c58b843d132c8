mod aggregate;
mod dispatch;
mod entity;
mod error;
mod event;
mod publisher;
mod record;
mod store;

pub use aggregate::Aggregate;
pub use dispatch::{DispatchError, DispatchRegistry, Subscriber, SubscriberResult};
pub use entity::Entity;
pub use error::StoreError;
pub use event::{CapturedEvent, DomainEvent};
pub use publisher::{DrainResult, OutboxPublisher, PublisherStats, PublisherThread};
pub use record::OutboxRecord;
pub use store::{MemoryStore, OutboxStore, Repository};

#[cfg(feature = "emitter")]
pub use dispatch::EmitterSubscriber;

// Re-export the EventEmitter from the event_emitter_rs crate
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;

// serde_json is part of the macro-generated code's expansion
#[doc(hidden)]
pub use serde_json;
