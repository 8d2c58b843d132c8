use std::fmt;
use std::time::SystemTime;

/// A fact raised by an aggregate while handling a command.
///
/// Implementations carry their routing tag and serialize themselves to the
/// JSON form stored in the outbox. Use [`domain_event!`](crate::domain_event)
/// to wire a serde type to its tag.
pub trait DomainEvent: Send + Sync {
    /// The tag used to route and deserialize this event.
    fn event_type(&self) -> &'static str;

    /// The JSON snapshot persisted as the record payload.
    fn payload_json(&self) -> Result<String, serde_json::Error>;
}

/// Implement [`DomainEvent`] for a serde type with the given tag.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct OrderPlaced { order_id: String }
///
/// domain_event!(OrderPlaced, "OrderPlaced");
///
/// registry.register(OrderPlaced::EVENT_TYPE, |event: &OrderPlaced| { ... });
/// ```
#[macro_export]
macro_rules! domain_event {
    ($ty:ty, $tag:expr) => {
        impl $ty {
            pub const EVENT_TYPE: &'static str = $tag;
        }

        impl $crate::DomainEvent for $ty {
            fn event_type(&self) -> &'static str {
                Self::EVENT_TYPE
            }

            fn payload_json(
                &self,
            ) -> ::std::result::Result<::std::string::String, $crate::serde_json::Error> {
                $crate::serde_json::to_string(self)
            }
        }
    };
}

/// An event held in an aggregate's capture buffer, stamped at raise time.
///
/// Serialization is deferred to the commit path so a non-serializable payload
/// fails the whole business operation rather than dropping the event.
pub struct CapturedEvent {
    occurred_at: SystemTime,
    event: Box<dyn DomainEvent>,
}

impl CapturedEvent {
    pub(crate) fn new(event: Box<dyn DomainEvent>) -> Self {
        CapturedEvent {
            occurred_at: SystemTime::now(),
            event,
        }
    }

    pub fn occurred_at(&self) -> SystemTime {
        self.occurred_at
    }

    pub fn event_type(&self) -> &'static str {
        self.event.event_type()
    }

    pub fn payload_json(&self) -> Result<String, serde_json::Error> {
        self.event.payload_json()
    }
}

impl fmt::Debug for CapturedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedEvent")
            .field("event_type", &self.event_type())
            .field("occurred_at", &self.occurred_at)
            .finish()
    }
}
