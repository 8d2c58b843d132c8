//! Persistence seams for the outbox.
//!
//! The write side ([`Repository`]) commits business rows and captured events
//! in one atomic unit; the read side ([`OutboxStore`]) is everything the
//! publisher needs to discover, deliver, and account for records.
//! [`MemoryStore`] implements both with real all-or-nothing semantics.

mod memory;
mod outbox;
mod repository;

pub use memory::MemoryStore;
pub use outbox::OutboxStore;
pub use repository::Repository;
