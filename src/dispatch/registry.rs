use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use super::subscriber::Subscriber;

/// Why a record could not be delivered.
#[derive(Debug)]
pub enum DispatchError {
    /// No subscribers registered for the event type. A configuration error:
    /// it will not self-heal without a registry change, so the record burns
    /// through its retries into quarantine.
    Unroutable { event_type: String },
    /// The stored payload did not deserialize into the registered type.
    Payload { event_type: String, message: String },
    /// A subscriber callback returned an error.
    Subscriber { event_type: String, message: String },
    /// A subscriber did not complete within the configured timeout.
    Timeout {
        event_type: String,
        waited: Duration,
    },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Unroutable { event_type } => {
                write!(f, "no subscribers registered for event type {}", event_type)
            }
            DispatchError::Payload {
                event_type,
                message,
            } => write!(f, "failed to deserialize {} payload: {}", event_type, message),
            DispatchError::Subscriber {
                event_type,
                message,
            } => write!(f, "subscriber for {} failed: {}", event_type, message),
            DispatchError::Timeout {
                event_type,
                waited,
            } => write!(
                f,
                "dispatch of {} timed out after {:?}",
                event_type, waited
            ),
        }
    }
}

impl std::error::Error for DispatchError {}

trait ErasedSubscriber: Send + Sync {
    fn dispatch(&self, event_type: &str, payload: &str) -> Result<(), DispatchError>;
}

struct TypedSubscriber<E, S> {
    subscriber: S,
    _payload: PhantomData<fn(&E)>,
}

impl<E, S> ErasedSubscriber for TypedSubscriber<E, S>
where
    E: DeserializeOwned,
    S: Subscriber<E>,
{
    fn dispatch(&self, event_type: &str, payload: &str) -> Result<(), DispatchError> {
        let event: E = serde_json::from_str(payload).map_err(|err| DispatchError::Payload {
            event_type: event_type.to_string(),
            message: err.to_string(),
        })?;
        self.subscriber
            .on_event(&event)
            .map_err(|err| DispatchError::Subscriber {
                event_type: event_type.to_string(),
                message: err.to_string(),
            })
    }
}

/// Startup-time mapping from event-type tag to payload type and subscribers.
///
/// The mapping is explicit: a tag that was never registered is a
/// configuration error surfaced at delivery time as [`DispatchError::Unroutable`],
/// never as success. Multiple subscribers per tag run in registration order.
///
/// ```ignore
/// let mut registry = DispatchRegistry::new();
/// registry.register(OrderPlaced::EVENT_TYPE, |event: &OrderPlaced| {
///     invalidate_cache(&event.order_id);
///     Ok(())
/// });
/// ```
#[derive(Default)]
pub struct DispatchRegistry {
    subscribers: HashMap<String, Vec<Arc<dyn ErasedSubscriber>>>,
}

impl DispatchRegistry {
    pub fn new() -> Self {
        DispatchRegistry {
            subscribers: HashMap::new(),
        }
    }

    /// Register a subscriber for an event type. `E` is the payload type the
    /// stored JSON deserializes into before the subscriber runs.
    pub fn register<E, S>(&mut self, event_type: impl Into<String>, subscriber: S)
    where
        E: DeserializeOwned + 'static,
        S: Subscriber<E> + 'static,
    {
        self.subscribers
            .entry(event_type.into())
            .or_default()
            .push(Arc::new(TypedSubscriber {
                subscriber,
                _payload: PhantomData,
            }));
    }

    pub fn registered_types(&self) -> Vec<&str> {
        self.subscribers.keys().map(String::as_str).collect()
    }

    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.subscribers
            .get(event_type)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Run every subscriber registered for the tag, in order. The first
    /// failure stops the attempt; the whole list re-runs on retry.
    pub fn dispatch(&self, event_type: &str, payload: &str) -> Result<(), DispatchError> {
        let Some(list) = self.subscribers.get(event_type) else {
            tracing::error!(event_type, "no subscribers registered for event type");
            return Err(DispatchError::Unroutable {
                event_type: event_type.to_string(),
            });
        };

        for subscriber in list {
            subscriber.dispatch(event_type, payload)?;
        }
        Ok(())
    }
}
