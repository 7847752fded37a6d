//! Pool lifecycle events.
//!
//! Every state change the pool makes is published twice: to registered
//! [`PoolObserver`]s, called synchronously after the registry lock has been
//! dropped, and on a `tokio::sync::broadcast` channel for consumers that
//! prefer a stream. A broadcast with no receivers is not an error.

use crate::data::backend::StorageMode;
use crate::data::kind::KindTag;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the broadcast channel. Slow receivers see `Lagged`.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Something that happened to a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PoolEvent {
    /// A record was registered; it starts locked.
    Registered {
        /// Record identifier.
        data_id: String,
        /// Kind of the new record.
        kind: KindTag,
        /// Registering source.
        source_id: String,
    },
    /// A payload was written.
    Stored {
        /// Record identifier.
        data_id: String,
        /// Elements now stored.
        element_count: usize,
        /// Encoded size now stored.
        byte_length: u64,
    },
    /// The record was locked.
    Locked {
        /// Record identifier.
        data_id: String,
    },
    /// The record became readable.
    Unlocked {
        /// Record identifier.
        data_id: String,
    },
    /// A subscriber was bound.
    SubscriberAdded {
        /// Record identifier.
        data_id: String,
        /// The new subscriber.
        subscriber_id: String,
    },
    /// A subscriber finished reading.
    Acknowledged {
        /// Record identifier.
        data_id: String,
        /// The acknowledging subscriber.
        subscriber_id: String,
    },
    /// Every subscriber acknowledged and the record was freed.
    Released {
        /// Record identifier.
        data_id: String,
    },
    /// The record was deleted explicitly.
    Deleted {
        /// Record identifier.
        data_id: String,
    },
    /// A delete was refused because the record is protected.
    DeleteRefused {
        /// Record identifier.
        data_id: String,
    },
    /// The record moved to another backend.
    Converted {
        /// Record identifier.
        data_id: String,
        /// The new backend.
        mode: StorageMode,
    },
}

impl PoolEvent {
    /// Identifier of the record the event is about.
    #[must_use]
    pub fn data_id(&self) -> &str {
        match self {
            PoolEvent::Registered { data_id, .. }
            | PoolEvent::Stored { data_id, .. }
            | PoolEvent::Locked { data_id }
            | PoolEvent::Unlocked { data_id }
            | PoolEvent::SubscriberAdded { data_id, .. }
            | PoolEvent::Acknowledged { data_id, .. }
            | PoolEvent::Released { data_id }
            | PoolEvent::Deleted { data_id }
            | PoolEvent::DeleteRefused { data_id }
            | PoolEvent::Converted { data_id, .. } => data_id,
        }
    }
}

/// Callback invoked for each pool event.
pub trait PoolObserver: Send + Sync {
    /// Called after the registry lock has been dropped, in emission order.
    fn on_event(&self, event: &PoolEvent);
}

impl<F> PoolObserver for F
where
    F: Fn(&PoolEvent) + Send + Sync,
{
    fn on_event(&self, event: &PoolEvent) {
        self(event);
    }
}

/// Fan-out of events to observers and broadcast receivers.
pub(crate) struct EventBus {
    observers: RwLock<Vec<Arc<dyn PoolObserver>>>,
    sender: broadcast::Sender<PoolEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            observers: RwLock::new(Vec::new()),
            sender,
        }
    }

    pub fn add_observer(&self, observer: Arc<dyn PoolObserver>) {
        self.observers.write().push(observer);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.sender.subscribe()
    }

    /// Publish `events` in order. Must not be called with the registry lock held.
    pub fn emit(&self, events: Vec<PoolEvent>) {
        if events.is_empty() {
            return;
        }
        let observers = self.observers.read().clone();
        for event in events {
            for observer in &observers {
                observer.on_event(&event);
            }
            let _ = self.sender.send(event);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observers.read().len())
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}
