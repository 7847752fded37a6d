//! Acknowledgment barrier.
//!
//! A record is released once it has at least one subscriber, every
//! subscriber has acknowledged, and it is not protected. The predicate is a
//! logical AND over per-subscriber flags, so a subscriber added after the
//! others acknowledged holds the record until it acknowledges too.

use crate::pool::bindings::{SourceBinding, SubscriberBinding};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle position of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    /// Being written; reads are refused.
    Locked,
    /// Readable by subscribers.
    Unlocked,
    /// Backend freed and record removed from the pool.
    Released,
}

impl RecordState {
    /// State of a registered record. Never `Released`.
    #[must_use]
    pub fn from_binding(binding: &SourceBinding) -> Self {
        if binding.locked {
            RecordState::Locked
        } else {
            RecordState::Unlocked
        }
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordState::Locked => f.write_str("locked"),
            RecordState::Unlocked => f.write_str("unlocked"),
            RecordState::Released => f.write_str("released"),
        }
    }
}

/// Whether the record behind `source` may be released now.
#[must_use]
pub fn should_release(source: &SourceBinding, subscribers: &[SubscriberBinding]) -> bool {
    !source.protected && !subscribers.is_empty() && subscribers.iter().all(|s| s.acknowledged)
}

/// Subscribers still holding the record.
#[must_use]
pub fn pending(subscribers: &[SubscriberBinding]) -> Vec<&str> {
    subscribers
        .iter()
        .filter(|s| !s.acknowledged)
        .map(|s| s.subscriber_id.as_str())
        .collect()
}
