//! Subscription registry and reader handles.
//!
//! Each subscription owns a bounded queue of envelopes. The registry keeps
//! the sending side; the subscriber gets a [`Subscription`] handle with the
//! receiving side:
//!
//! ```ignore
//! let registry = Registry::new(64);
//! let sub = registry.add(SubscribeRequest::parse("/ci/?recursive")?.into())?;
//!
//! for envelope in sub.iter() {
//!     println!("{:?}", envelope.body_str());
//! }
//! // Loop ends once the subscription is removed.
//! ```

mod registry;
mod types;

pub use registry::{Delivery, LiveSubscription, Registry};
pub use types::{DropReason, Subscription, SubscriptionId};
