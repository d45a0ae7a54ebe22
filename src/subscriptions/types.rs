//! Subscription handle types.

use crate::envelope::Envelope;
use crate::topics::{TopicFilter, TopicPath};
use crate::types::SubscriptionStats;
use crossbeam_channel::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Opaque identity of one subscription.
///
/// Only the registry that issued an id can remove with it; ids from
/// another broker never match.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId {
    registry: u64,
    seq: u64,
}

impl SubscriptionId {
    pub(crate) fn new(registry: u64, seq: u64) -> Self {
        Self { registry, seq }
    }

    pub(crate) fn registry(&self) -> u64 {
        self.registry
    }
}

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({}.{})", self.registry, self.seq)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.registry, self.seq)
    }
}

/// Why a subscription left the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Explicitly unsubscribed.
    Unsubscribed,
    /// Queue overflowed under the drop-subscriber policy.
    BufferOverflow,
    /// The handle was dropped by its reader.
    Disconnected,
    /// The broker shut down.
    Shutdown,
}

/// Delivery counters shared between the registry entry and the handle.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) delivered: AtomicU64,
    pub(crate) dropped: AtomicU64,
    /// Set once the reader drops its handle.
    pub(crate) detached: AtomicBool,
}

impl Counters {
    pub(crate) fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    pub(crate) fn snapshot(&self) -> SubscriptionStats {
        SubscriptionStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// A live subscription, as held by its reader.
///
/// Exposes the receive side of the subscription's private queue. When the
/// subscription is removed (unsubscribe, overflow under the drop-subscriber
/// policy, or broker shutdown) the queue closes: buffered envelopes can
/// still be read, after which `recv` returns an error instead of blocking.
///
/// Call [`Broker::unsubscribe`](crate::Broker::unsubscribe) when done.
/// A handle that is merely dropped stays registered until the next
/// subscribe or the next publish to a matching topic sweeps it out.
pub struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) filter: TopicFilter,
    pub(crate) receiver: Receiver<Arc<Envelope>>,
    pub(crate) counters: Arc<Counters>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &TopicPath {
        &self.filter.pattern
    }

    pub fn is_recursive(&self) -> bool {
        self.filter.recursive
    }

    pub fn filter(&self) -> &TopicFilter {
        &self.filter
    }

    pub fn stats(&self) -> SubscriptionStats {
        self.counters.snapshot()
    }

    /// Number of envelopes waiting to be read.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Receive the next envelope (blocking).
    pub fn recv(&self) -> Result<Arc<Envelope>, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an envelope (non-blocking).
    pub fn try_recv(&self) -> Result<Arc<Envelope>, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Arc<Envelope>, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Blocking iterator that ends when the subscription is closed.
    pub fn iter(&self) -> crossbeam_channel::Iter<'_, Arc<Envelope>> {
        self.receiver.iter()
    }

    pub fn receiver(&self) -> &Receiver<Arc<Envelope>> {
        &self.receiver
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.counters.detached.store(true, Ordering::Release);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .finish()
    }
}
