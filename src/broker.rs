//! The broker: publish fan-out and subscription lifecycle.

use crate::envelope::Envelope;
use crate::error::Result;
use crate::subscriptions::{Delivery, DropReason, Registry, Subscription, SubscriptionId};
use crate::topics::{SubscribeRequest, TopicFilter, TopicPath};
use crate::types::BrokerStats;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Upper bound on the per-subscriber wait of [`OverflowPolicy::Wait`].
pub const MAX_WAIT_MS: u64 = 1000;

/// What to do when a subscriber's queue is full at delivery time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the new envelope for that subscriber only and count it.
    #[default]
    DropMessage,
    /// Remove the subscriber, closing its queue.
    DropSubscriber,
    /// Wait up to `timeout_ms` for space, then drop and count.
    ///
    /// Clamped to [`MAX_WAIT_MS`]. Waits are per subscriber and serial, so
    /// a publish can take up to the wait times the number of stalled
    /// recipients.
    Wait { timeout_ms: u64 },
}

impl OverflowPolicy {
    /// The same policy with any wait clamped to [`MAX_WAIT_MS`].
    pub fn clamped(self) -> Self {
        match self {
            OverflowPolicy::Wait { timeout_ms } => OverflowPolicy::Wait {
                timeout_ms: timeout_ms.min(MAX_WAIT_MS),
            },
            other => other,
        }
    }
}

/// Broker configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Per-subscription queue capacity.
    /// Default: 1000
    pub buffer_size: usize,

    /// Policy for full subscriber queues.
    pub overflow: OverflowPolicy,

    /// Stamp envelopes with their topic and publish time.
    /// Default: true
    pub include_metadata: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            overflow: OverflowPolicy::default(),
            include_metadata: true,
        }
    }
}

/// Routes published payloads to live subscriptions.
///
/// Each broker owns its registry; any number of brokers can coexist. All
/// operations take `&self`, so a broker is normally shared behind an `Arc`
/// by the request handlers that call into it.
///
/// After [`Broker::shutdown`], `publish` and `subscribe` fail with
/// [`HookbotError::ShutDown`](crate::HookbotError::ShutDown). Dropping the
/// broker shuts it down.
pub struct Broker {
    config: BrokerConfig,
    registry: Registry,
    published: AtomicU64,
    deliveries: AtomicU64,
    dropped: AtomicU64,
}

impl Broker {
    pub fn new(mut config: BrokerConfig) -> Self {
        config.overflow = config.overflow.clamped();
        let registry = Registry::new(config.buffer_size);
        Self {
            config,
            registry,
            published: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Subscribe using the wire syntax, e.g. `/github/acme/?recursive`.
    pub fn subscribe(&self, topic: &str) -> Result<Subscription> {
        let request = SubscribeRequest::parse(topic)?;
        self.subscribe_to(request.into())
    }

    /// Subscribe with an already parsed filter.
    pub fn subscribe_to(&self, filter: TopicFilter) -> Result<Subscription> {
        let subscription = self.registry.add(filter)?;
        debug!(
            id = %subscription.id(),
            topic = %subscription.topic(),
            recursive = subscription.is_recursive(),
            "subscribed"
        );
        Ok(subscription)
    }

    /// Remove a subscription. Unknown or already removed ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if self.registry.remove(id) {
            debug!(id = %id, reason = ?DropReason::Unsubscribed, "subscription removed");
        }
    }

    /// Publish `payload` to `topic`, given in wire syntax.
    ///
    /// Succeeds once the envelope has been offered to every matching
    /// subscription, including when nothing matches. A subscriber whose
    /// queue is full loses this envelope; that is never reported here.
    pub fn publish(&self, topic: &str, payload: impl Into<Vec<u8>>) -> Result<()> {
        let topic = TopicPath::parse(topic)?;
        self.publish_to(&topic, payload)
    }

    /// Publish to an already parsed topic.
    pub fn publish_to(&self, topic: &TopicPath, payload: impl Into<Vec<u8>>) -> Result<()> {
        let matching = self.registry.matching_for(topic)?;
        self.published.fetch_add(1, Ordering::Relaxed);

        let envelope = Arc::new(if self.config.include_metadata {
            Envelope::published(topic.clone(), payload)
        } else {
            Envelope::new(payload)
        });

        trace!(topic = %topic, recipients = matching.len(), "publish");

        let mut to_remove = Vec::new();
        for sub in &matching {
            let outcome = match self.config.overflow {
                OverflowPolicy::Wait { timeout_ms } => {
                    sub.deliver_within(Arc::clone(&envelope), Duration::from_millis(timeout_ms))
                }
                _ => sub.try_deliver(Arc::clone(&envelope)),
            };

            match outcome {
                Delivery::Delivered => {
                    self.deliveries.fetch_add(1, Ordering::Relaxed);
                }
                Delivery::Full => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        id = %sub.id(),
                        topic = %topic,
                        "subscriber queue full, envelope dropped"
                    );
                    if self.config.overflow == OverflowPolicy::DropSubscriber {
                        to_remove.push((sub.id(), DropReason::BufferOverflow));
                    }
                }
                Delivery::Disconnected => {
                    to_remove.push((sub.id(), DropReason::Disconnected));
                }
            }
        }
        // Release our senders before removal so closed queues close now.
        drop(matching);

        for (id, reason) in to_remove {
            if self.registry.remove(id) {
                warn!(id = %id, reason = ?reason, "subscription removed");
            }
        }

        Ok(())
    }

    /// Close every subscription and refuse further publishes and
    /// subscribes. Repeated calls do nothing.
    pub fn shutdown(&self) {
        if self.registry.is_closed() {
            return;
        }
        let closed = self.registry.close();
        info!(subscriptions = closed, reason = ?DropReason::Shutdown, "broker shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.registry.is_closed()
    }

    pub fn subscription_count(&self) -> usize {
        self.registry.len()
    }

    pub fn stats(&self) -> BrokerStats {
        BrokerStats {
            subscriptions: self.registry.len() as u64,
            published: self.published.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(BrokerConfig::default())
    }
}

impl Drop for Broker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
