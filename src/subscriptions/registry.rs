//! The live subscription set.

use crate::envelope::Envelope;
use crate::error::{HookbotError, Result};
use crate::topics::{TopicFilter, TopicPath};
use crossbeam_channel::{bounded, SendTimeoutError, Sender, TrySendError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::types::{Counters, Subscription, SubscriptionId};

/// Source of per-registry tokens, so ids from different brokers differ.
static NEXT_REGISTRY: AtomicU64 = AtomicU64::new(1);

/// Outcome of handing one envelope to one subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The queue was full (or stayed full for the whole wait).
    Full,
    /// The reader dropped its handle.
    Disconnected,
}

/// Registry-side state of one subscription.
///
/// Holds the only sender of the subscription's queue; dropping the last
/// `Arc` to it closes the queue.
pub struct LiveSubscription {
    id: SubscriptionId,
    filter: TopicFilter,
    sender: Sender<Arc<Envelope>>,
    counters: Arc<Counters>,
}

impl LiveSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn filter(&self) -> &TopicFilter {
        &self.filter
    }

    /// Non-blocking send.
    pub fn try_deliver(&self, envelope: Arc<Envelope>) -> Delivery {
        let result = match self.sender.try_send(envelope) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => Delivery::Full,
            Err(TrySendError::Disconnected(_)) => Delivery::Disconnected,
        };
        self.record(result)
    }

    /// Send, waiting at most `timeout` for queue space.
    pub fn deliver_within(&self, envelope: Arc<Envelope>, timeout: Duration) -> Delivery {
        let result = match self.sender.send_timeout(envelope, timeout) {
            Ok(()) => Delivery::Delivered,
            Err(SendTimeoutError::Timeout(_)) => Delivery::Full,
            Err(SendTimeoutError::Disconnected(_)) => Delivery::Disconnected,
        };
        self.record(result)
    }

    fn record(&self, result: Delivery) -> Delivery {
        match result {
            Delivery::Delivered => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Delivery::Full => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Delivery::Disconnected => {}
        }
        result
    }
}

struct RegistryState {
    subscriptions: HashMap<SubscriptionId, Arc<LiveSubscription>>,
    closed: bool,
}

/// Concurrency-safe set of live subscriptions.
///
/// One lock guards both structural changes and the snapshot taken for
/// matching. Matching itself runs on the snapshot, outside the lock, and no
/// send ever happens while the lock is held.
pub struct Registry {
    token: u64,
    state: RwLock<RegistryState>,
    next_id: AtomicU64,
    buffer_size: usize,
}

impl Registry {
    /// Create a registry whose subscriptions buffer up to `buffer_size`
    /// envelopes. Zero is treated as one.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            token: NEXT_REGISTRY.fetch_add(1, Ordering::Relaxed),
            state: RwLock::new(RegistryState {
                subscriptions: HashMap::new(),
                closed: false,
            }),
            next_id: AtomicU64::new(1),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Insert a new subscription and return its reader handle.
    ///
    /// Also sweeps out entries whose handles were dropped.
    pub fn add(&self, filter: TopicFilter) -> Result<Subscription> {
        let (sender, receiver) = bounded(self.buffer_size);
        let counters = Arc::new(Counters::default());

        let mut state = self.state.write();
        if state.closed {
            return Err(HookbotError::ShutDown);
        }
        state
            .subscriptions
            .retain(|_, sub| !sub.counters.is_detached());

        let id = SubscriptionId::new(self.token, self.next_id.fetch_add(1, Ordering::SeqCst));
        let live = LiveSubscription {
            id,
            filter: filter.clone(),
            sender,
            counters: Arc::clone(&counters),
        };
        state.subscriptions.insert(id, Arc::new(live));

        Ok(Subscription {
            id,
            filter,
            receiver,
            counters,
        })
    }

    /// Remove a subscription, closing its queue. Returns false if it was
    /// already gone.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        if id.registry() != self.token {
            return false;
        }
        let removed = self.state.write().subscriptions.remove(&id);
        // Dropped outside the lock.
        removed.is_some()
    }

    /// Every live subscription whose filter matches `topic`.
    pub fn matching_for(&self, topic: &TopicPath) -> Result<Vec<Arc<LiveSubscription>>> {
        let snapshot: Vec<Arc<LiveSubscription>> = {
            let state = self.state.read();
            if state.closed {
                return Err(HookbotError::ShutDown);
            }
            state.subscriptions.values().cloned().collect()
        };

        Ok(snapshot
            .into_iter()
            .filter(|sub| sub.filter.matches(topic))
            .collect())
    }

    /// Refuse further additions and remove everything. Returns the number
    /// of subscriptions removed; zero on repeated calls.
    pub fn close(&self) -> usize {
        let drained: Vec<Arc<LiveSubscription>> = {
            let mut state = self.state.write();
            state.closed = true;
            state.subscriptions.drain().map(|(_, sub)| sub).collect()
        };
        drained.len()
    }

    pub fn is_closed(&self) -> bool {
        self.state.read().closed
    }

    pub fn len(&self) -> usize {
        self.state.read().subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
