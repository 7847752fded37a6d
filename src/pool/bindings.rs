//! Source and subscriber binding tables.

use crate::error::{PoolError, PoolResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Write authorization and lock/protect state for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBinding {
    /// The only caller allowed to write the record.
    pub source_id: String,
    /// Record identifier.
    pub data_id: String,
    /// Reads are refused while set.
    pub locked: bool,
    /// Protected records are never released or deleted.
    pub protected: bool,
}

/// One consumer's read state for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberBinding {
    /// Consumer identifier.
    pub subscriber_id: String,
    /// Record identifier.
    pub data_id: String,
    /// Set once the subscriber has finished reading.
    pub acknowledged: bool,
}

/// Both binding relations, keyed by record identifier.
#[derive(Debug, Default)]
pub(crate) struct BindingTables {
    sources: HashMap<String, SourceBinding>,
    subscribers: HashMap<String, Vec<SubscriberBinding>>,
}

impl BindingTables {
    pub fn insert_source(&mut self, data_id: &str, source_id: &str, protected: bool) {
        self.sources.insert(
            data_id.to_owned(),
            SourceBinding {
                source_id: source_id.to_owned(),
                data_id: data_id.to_owned(),
                locked: true,
                protected,
            },
        );
    }

    pub fn source(&self, data_id: &str) -> PoolResult<&SourceBinding> {
        self.sources
            .get(data_id)
            .ok_or_else(|| PoolError::NotFound(data_id.to_owned()))
    }

    pub fn source_mut(&mut self, data_id: &str) -> PoolResult<&mut SourceBinding> {
        self.sources
            .get_mut(data_id)
            .ok_or_else(|| PoolError::NotFound(data_id.to_owned()))
    }

    /// The binding of `source_id`, or `Unauthorized` if someone else registered the record.
    pub fn authorized_source(
        &mut self,
        data_id: &str,
        source_id: &str,
    ) -> PoolResult<&mut SourceBinding> {
        let binding = self.source_mut(data_id)?;
        if binding.source_id != source_id {
            return Err(PoolError::Unauthorized(format!(
                "source {source_id} is not allowed to write data {data_id}"
            )));
        }
        Ok(binding)
    }

    /// Add a pending subscriber. Returns `false` if it was already bound.
    pub fn add_subscriber(&mut self, data_id: &str, subscriber_id: &str) -> bool {
        let list = self.subscribers.entry(data_id.to_owned()).or_default();
        if list.iter().any(|s| s.subscriber_id == subscriber_id) {
            return false;
        }
        list.push(SubscriberBinding {
            subscriber_id: subscriber_id.to_owned(),
            data_id: data_id.to_owned(),
            acknowledged: false,
        });
        true
    }

    pub fn subscribers(&self, data_id: &str) -> &[SubscriberBinding] {
        self.subscribers.get(data_id).map_or(&[], Vec::as_slice)
    }

    /// `Unauthorized` unless `subscriber_id` was added to `data_id`.
    pub fn require_subscriber(&self, data_id: &str, subscriber_id: &str) -> PoolResult<()> {
        if self
            .subscribers(data_id)
            .iter()
            .any(|s| s.subscriber_id == subscriber_id)
        {
            Ok(())
        } else {
            Err(PoolError::Unauthorized(format!(
                "subscriber {subscriber_id} is not registered for data {data_id}"
            )))
        }
    }

    /// Flag the subscriber as acknowledged. Returns `true` on the first call.
    pub fn acknowledge(&mut self, data_id: &str, subscriber_id: &str) -> PoolResult<bool> {
        let binding = self
            .subscribers
            .get_mut(data_id)
            .and_then(|list| list.iter_mut().find(|s| s.subscriber_id == subscriber_id))
            .ok_or_else(|| {
                PoolError::Unauthorized(format!(
                    "subscriber {subscriber_id} is not registered for data {data_id}"
                ))
            })?;
        let first = !binding.acknowledged;
        binding.acknowledged = true;
        Ok(first)
    }

    /// Drop every binding of a record.
    pub fn remove(&mut self, data_id: &str) {
        self.sources.remove(data_id);
        self.subscribers.remove(data_id);
    }
}
