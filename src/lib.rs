//! # Hookbot
//!
//! A hierarchical-topic publish/subscribe relay. Producers publish opaque
//! payloads (typically webhook deliveries) to a topic path; subscribers
//! listen on a topic, optionally recursively, and receive every payload
//! published there for as long as their subscription stays open.
//!
//! ## Core Concepts
//!
//! - **Topics**: Rooted `/`-delimited paths; `/foo/` and `/foo` are the same
//! - **Subscriptions**: Exact, or recursive via a `?recursive` marker
//! - **Envelopes**: The delivered form of a payload, `{"Body": ...}` on the wire
//! - **Broker**: Owns the registry and fans publishes out to bounded queues
//!
//! Delivery is live only. A subscriber that is not connected at publish
//! time never sees the payload, and a subscriber whose queue is full loses
//! it without slowing anyone else down.
//!
//! ## Example
//!
//! ```ignore
//! use hookbot::{Broker, BrokerConfig, WireFormat};
//!
//! let broker = Broker::new(BrokerConfig::default());
//!
//! let sub = broker.subscribe("/github/acme/?recursive")?;
//! broker.publish("/github/acme/widgets", r#"{"ref":"refs/heads/main"}"#)?;
//!
//! let envelope = sub.recv()?;
//! let frame = envelope.encode(WireFormat::Json)?;
//!
//! broker.unsubscribe(sub.id());
//! broker.shutdown();
//! ```

pub mod broker;
pub mod envelope;
pub mod error;
pub mod subscriptions;
pub mod topics;
pub mod types;

// Re-exports
pub use broker::{Broker, BrokerConfig, OverflowPolicy, MAX_WAIT_MS};
pub use envelope::{decode, encode, Envelope, WireFormat};
pub use error::{HookbotError, Result};
pub use subscriptions::{
    Delivery, DropReason, LiveSubscription, Registry, Subscription, SubscriptionId,
};
pub use topics::{
    matches, SubscribeRequest, TopicFilter, TopicPath, RECURSIVE_FLAG, TOPIC_DELIMITER,
};
pub use types::*;
