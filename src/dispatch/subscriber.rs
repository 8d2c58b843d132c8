use std::error::Error;

#[cfg(feature = "emitter")]
use std::sync::Mutex;

#[cfg(feature = "emitter")]
use crate::event::DomainEvent;
#[cfg(feature = "emitter")]
use event_emitter_rs::EventEmitter;

/// Outcome of a subscriber callback. Any error is recorded against the
/// record and triggers a retry.
pub type SubscriberResult = Result<(), Box<dyn Error + Send + Sync>>;

/// A callback interested in events of type `E`.
///
/// Subscribers must be idempotent: delivery is at-least-once, and a failing
/// co-subscriber causes the whole list to run again on retry.
pub trait Subscriber<E>: Send + Sync {
    fn on_event(&self, event: &E) -> SubscriberResult;
}

impl<E, F> Subscriber<E> for F
where
    F: Fn(&E) -> SubscriberResult + Send + Sync,
{
    fn on_event(&self, event: &E) -> SubscriberResult {
        self(event)
    }
}

/// Forwards delivered events to an [`EventEmitter`] under their event-type
/// name, for in-process listeners that cannot fail.
/// Requires the `emitter` feature to be enabled.
#[cfg(feature = "emitter")]
pub struct EmitterSubscriber {
    emitter: Mutex<EventEmitter>,
}

#[cfg(feature = "emitter")]
impl EmitterSubscriber {
    pub fn new(emitter: EventEmitter) -> Self {
        EmitterSubscriber {
            emitter: Mutex::new(emitter),
        }
    }
}

#[cfg(feature = "emitter")]
impl<E: DomainEvent> Subscriber<E> for EmitterSubscriber {
    fn on_event(&self, event: &E) -> SubscriberResult {
        let payload = event.payload_json()?;
        let mut emitter = self
            .emitter
            .lock()
            .map_err(|_| "emitter lock poisoned")?;
        emitter.emit(event.event_type(), payload);
        Ok(())
    }
}
