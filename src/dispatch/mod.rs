//! In-process dispatch: the startup-time mapping from a stored event-type
//! tag to its payload type and subscriber callbacks.

mod registry;
mod subscriber;

pub use registry::{DispatchError, DispatchRegistry};
pub use subscriber::{Subscriber, SubscriberResult};

#[cfg(feature = "emitter")]
pub use subscriber::EmitterSubscriber;
