//! The read side of the outbox: a background loop that discovers
//! undelivered records, dispatches them to subscribers, and accounts for
//! every outcome.

mod drain;
mod thread;

pub use drain::{DrainResult, OutboxPublisher};
pub use thread::{PublisherStats, PublisherThread};
