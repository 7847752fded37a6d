//! The data pool: record registry, source/subscriber bindings and the
//! acknowledgment barrier.
//!
//! ## Locking
//!
//! One `parking_lot::Mutex` guards the registry structure and both binding
//! tables, so admission checks, acknowledgments, release decisions and
//! `add_subscriber` are atomic with respect to each other. Each record sits
//! behind its own `RwLock` so bulk I/O (`store`, `get_data`, conversions)
//! runs without holding the registry lock. A record lock is never requested
//! while the registry lock is held; callers clone the record handle and drop
//! the registry guard first.
//!
//! `store` and the conversions claim a record exclusively in the registry
//! before touching it and settle its lock flag when they finish. While a
//! claim is held, `lock`, `unlock`, other stores and conversions fail with
//! `Locked` instead of racing on the flag.
//!
//! Events are collected while the registry lock is held and published after
//! it has been dropped.

pub mod barrier;
pub mod bindings;
pub mod events;
pub mod stream;

use crate::config::PoolConfig;
use crate::data::backend::StorageMode;
use crate::data::codec::Samples;
use crate::data::kind::{DataKind, KindParams, KindTag};
use crate::data::record::{Convertible, DataRecord, RecordInfo, Streamable};
use crate::error::{PoolError, PoolResult};
use crate::validation;
use barrier::RecordState;
use bindings::{BindingTables, SourceBinding, SubscriberBinding};
use events::{EventBus, PoolEvent, PoolObserver};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stream::PoolChunks;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

type SharedRecord = Arc<RwLock<DataRecord>>;

/// What a `store` call writes.
enum Payload<I> {
    Whole(Samples),
    Chunks(I),
}

#[derive(Debug, Default)]
struct Registry {
    records: HashMap<String, SharedRecord>,
    bindings: BindingTables,
    /// Records with a store or conversion in progress.
    writing: HashSet<String>,
    /// Every released or deleted identifier, kept for the life of the pool so
    /// `state` can answer `Released`. One short string per retired record.
    retired: HashSet<String>,
}

impl Registry {
    fn record(&self, data_id: &str) -> PoolResult<SharedRecord> {
        self.records
            .get(data_id)
            .cloned()
            .ok_or_else(|| PoolError::NotFound(data_id.to_owned()))
    }

    /// The record, provided it exists and is not locked.
    fn readable(&self, data_id: &str) -> PoolResult<SharedRecord> {
        let record = self.record(data_id)?;
        if self.bindings.source(data_id)?.locked {
            return Err(PoolError::Locked(data_id.to_owned()));
        }
        Ok(record)
    }

    /// Claim `data_id` for a store or conversion.
    ///
    /// Returns the record and its lock flag before the claim; the record is
    /// locked for as long as the claim is held.
    fn claim(&mut self, data_id: &str) -> PoolResult<(SharedRecord, bool)> {
        let record = self.record(data_id)?;
        if self.writing.contains(data_id) {
            return Err(PoolError::Locked(data_id.to_owned()));
        }
        let binding = self.bindings.source_mut(data_id)?;
        let was_locked = binding.locked;
        binding.locked = true;
        self.writing.insert(data_id.to_owned());
        Ok((record, was_locked))
    }

    /// Give up a claim and leave the record with the given lock flag.
    fn settle(&mut self, data_id: &str, locked: bool) -> PoolResult<()> {
        self.writing.remove(data_id);
        self.bindings.source_mut(data_id)?.locked = locked;
        Ok(())
    }

    /// Remove a record and its bindings, returning it for backend cleanup.
    fn retire(&mut self, data_id: &str) -> Option<SharedRecord> {
        self.writing.remove(data_id);
        self.bindings.remove(data_id);
        self.retired.insert(data_id.to_owned());
        self.records.remove(data_id)
    }
}

#[derive(Debug)]
struct Shared {
    config: PoolConfig,
    registry: Mutex<Registry>,
    events: EventBus,
}

/// In-process pool of typed records shared between one source and any
/// number of subscribers per record.
///
/// `DataPool` is a cheap handle; clones refer to the same pool and can be
/// moved across threads.
#[derive(Debug, Clone)]
pub struct DataPool {
    shared: Arc<Shared>,
}

impl Default for DataPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl DataPool {
    /// An empty pool using `config` for storage defaults.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                registry: Mutex::new(Registry::default()),
                events: EventBus::new(),
            }),
        }
    }

    /// Configuration the pool was built with.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Register an observer called for every event after the registry lock is dropped.
    pub fn add_observer(&self, observer: impl PoolObserver + 'static) {
        self.shared.events.add_observer(Arc::new(observer));
    }

    /// A broadcast receiver of pool events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<PoolEvent> {
        self.shared.events.subscribe()
    }

    fn emit(&self, events: Vec<PoolEvent>) {
        self.shared.events.emit(events);
    }

    // ---------------------------------------------------------------------
    // Registration and writes
    // ---------------------------------------------------------------------

    /// Register a new, empty, locked record and return its identifier.
    ///
    /// `source_id` becomes the only caller allowed to store into it.
    pub fn register(
        &self,
        kind: KindTag,
        name: &str,
        source_id: &str,
        protected: bool,
        storage: StorageMode,
        params: KindParams,
    ) -> PoolResult<String> {
        validation::is_not_empty(source_id, "source_id")?;
        let data_kind = DataKind::from_params(kind, &params)?;
        let sample_type = kind.resolve_sample_type(params.sample_type)?;
        let data_id = Uuid::new_v4().to_string();
        let record = DataRecord::new(data_id.as_str(), name, data_kind, sample_type, storage)?;

        {
            let mut registry = self.shared.registry.lock();
            registry
                .records
                .insert(data_id.clone(), Arc::new(RwLock::new(record)));
            registry.bindings.insert_source(&data_id, source_id, protected);
        }
        info!(data_id = %data_id, kind = %kind, %source_id, %storage, protected, "registered data");
        self.emit(vec![PoolEvent::Registered {
            data_id: data_id.clone(),
            kind,
            source_id: source_id.to_owned(),
        }]);
        Ok(data_id)
    }

    /// Store a whole payload and unlock the record.
    ///
    /// Fails with `Unauthorized` unless `source_id` registered the record and
    /// it is currently locked. File-backed records need a folder, either
    /// passed here, configured as `storage.default_folder`, or already used by
    /// an earlier store.
    pub fn store(
        &self,
        data_id: &str,
        payload: impl Into<Samples>,
        source_id: &str,
        folder: Option<&Path>,
    ) -> PoolResult<()> {
        self.store_payload(
            data_id,
            source_id,
            folder,
            Payload::<std::iter::Empty<Samples>>::Whole(payload.into()),
        )
    }

    /// Store a lazy sequence of chunks and unlock the record.
    ///
    /// File-backed records are written chunk by chunk.
    pub fn store_from_chunks<I>(
        &self,
        data_id: &str,
        chunks: I,
        source_id: &str,
        folder: Option<&Path>,
    ) -> PoolResult<()>
    where
        I: IntoIterator<Item = Samples>,
    {
        self.store_payload(data_id, source_id, folder, Payload::Chunks(chunks))
    }

    fn store_payload<I>(
        &self,
        data_id: &str,
        source_id: &str,
        folder: Option<&Path>,
        payload: Payload<I>,
    ) -> PoolResult<()>
    where
        I: IntoIterator<Item = Samples>,
    {
        let record = {
            let mut registry = self.shared.registry.lock();
            let binding = registry.bindings.authorized_source(data_id, source_id)?;
            if !binding.locked {
                return Err(PoolError::Unauthorized(format!(
                    "data {data_id} must be locked before it can be written"
                )));
            }
            registry.claim(data_id)?.0
        };

        let written = self.write_payload(&record, folder, payload);
        // A failed store leaves the record locked with its previous contents.
        let settled = self.shared.registry.lock().settle(data_id, written.is_err());
        let (element_count, byte_length) = written?;
        settled?;

        info!(data_id, element_count, byte_length, "stored data");
        self.emit(vec![
            PoolEvent::Stored {
                data_id: data_id.to_owned(),
                element_count,
                byte_length,
            },
            PoolEvent::Unlocked {
                data_id: data_id.to_owned(),
            },
        ]);
        Ok(())
    }

    /// Write a payload into a claimed record, returning its new counts.
    fn write_payload<I>(
        &self,
        record: &SharedRecord,
        folder: Option<&Path>,
        payload: Payload<I>,
    ) -> PoolResult<(usize, u64)>
    where
        I: IntoIterator<Item = Samples>,
    {
        let tag = record.read().tag();
        let payload = match payload {
            Payload::Chunks(chunks) if tag.is_structured() => {
                let sample_type = record.read().store().sample_type();
                let mut whole = Samples::empty(sample_type);
                for chunk in chunks {
                    whole.append(chunk)?;
                }
                Payload::Whole(whole)
            }
            other => other,
        };
        if let (KindTag::FftCollection, Payload::Whole(samples)) = (tag, &payload) {
            self.check_fft_members(samples)?;
        }

        let counts = {
            let mut guard = record.write();
            let folder = self.resolve_folder(&guard, folder)?;
            let extension = &self.shared.config.storage.file_extension;
            match payload {
                Payload::Whole(samples) => {
                    guard.store_samples(samples, folder.as_deref(), extension)?;
                }
                Payload::Chunks(chunks) => {
                    guard.store_chunks(chunks, folder.as_deref(), extension)?;
                }
            }
            (guard.store().element_count(), guard.store().byte_length())
        };
        Ok(counts)
    }

    /// FFT collections may only reference registered frequency signals.
    fn check_fft_members(&self, payload: &Samples) -> PoolResult<()> {
        let members = payload.as_text().unwrap_or_default();
        let records = {
            let registry = self.shared.registry.lock();
            members
                .iter()
                .map(|member| registry.record(member))
                .collect::<PoolResult<Vec<_>>>()?
        };
        for (member, record) in members.iter().zip(records) {
            let tag = record.read().tag();
            if tag != KindTag::FreqSignal {
                return Err(PoolError::InvalidConfiguration(format!(
                    "FFT collection member {member} is a {tag} record, not a freq_signal"
                )));
            }
        }
        Ok(())
    }

    /// Folder for a file write: the caller's, else the configured default
    /// unless the record already has a file. Missing folders are created when
    /// configured to.
    fn resolve_folder(
        &self,
        record: &DataRecord,
        folder: Option<&Path>,
    ) -> PoolResult<Option<PathBuf>> {
        if record.store().mode() != Some(StorageMode::File) {
            return Ok(None);
        }
        let storage = &self.shared.config.storage;
        let folder = match folder {
            Some(folder) => Some(folder.to_path_buf()),
            None if record.store().file_path().is_none() => storage.default_folder.clone(),
            None => None,
        };
        if let Some(folder) = &folder {
            if storage.create_missing_folders && !folder.exists() {
                std::fs::create_dir_all(folder)?;
                debug!(folder = %folder.display(), "created storage folder");
            }
            validation::is_valid_folder(folder)?;
        }
        Ok(folder)
    }

    /// Edit kind metadata (e.g. the interpolation mode of a limit envelope).
    ///
    /// Only the registering source may edit, and only while the record is locked.
    pub fn update_kind<F>(&self, data_id: &str, source_id: &str, edit: F) -> PoolResult<()>
    where
        F: FnOnce(&mut DataKind) -> PoolResult<()>,
    {
        let record = {
            let mut registry = self.shared.registry.lock();
            let binding = registry.bindings.authorized_source(data_id, source_id)?;
            if !binding.locked {
                return Err(PoolError::Unauthorized(format!(
                    "data {data_id} must be locked before its metadata can change"
                )));
            }
            registry.record(data_id)?
        };
        record.write().update_kind(edit)?;
        debug!(data_id, "updated kind metadata");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Lock state and bindings
    // ---------------------------------------------------------------------

    /// Refuse all reads until `unlock` or a successful `store`.
    ///
    /// Fails with `Locked` while a store or conversion is in progress.
    pub fn lock(&self, data_id: &str) -> PoolResult<()> {
        let changed = self.set_locked(data_id, true)?;
        if changed {
            debug!(data_id, "locked data");
            self.emit(vec![PoolEvent::Locked {
                data_id: data_id.to_owned(),
            }]);
        }
        Ok(())
    }

    /// Make the record readable again without storing.
    ///
    /// Fails with `Locked` while a store or conversion is in progress.
    pub fn unlock(&self, data_id: &str) -> PoolResult<()> {
        let changed = self.set_locked(data_id, false)?;
        if changed {
            debug!(data_id, "unlocked data");
            self.emit(vec![PoolEvent::Unlocked {
                data_id: data_id.to_owned(),
            }]);
        }
        Ok(())
    }

    fn set_locked(&self, data_id: &str, locked: bool) -> PoolResult<bool> {
        let mut registry = self.shared.registry.lock();
        if registry.writing.contains(data_id) {
            return Err(PoolError::Locked(data_id.to_owned()));
        }
        let binding = registry.bindings.source_mut(data_id)?;
        let changed = binding.locked != locked;
        binding.locked = locked;
        Ok(changed)
    }

    /// Protect or unprotect a record. Only the registering source may do this.
    ///
    /// Unprotecting does not re-run the barrier; a fully acknowledged record
    /// stays until the next acknowledgment or an explicit `delete`.
    pub fn set_protected(&self, data_id: &str, source_id: &str, protected: bool) -> PoolResult<()> {
        let mut registry = self.shared.registry.lock();
        registry.bindings.authorized_source(data_id, source_id)?.protected = protected;
        debug!(data_id, protected, "changed protection");
        Ok(())
    }

    /// Bind a subscriber that must acknowledge before the record can be released.
    ///
    /// Adding the same subscriber twice is a no-op.
    pub fn add_subscriber(&self, data_id: &str, subscriber_id: &str) -> PoolResult<()> {
        validation::is_not_empty(subscriber_id, "subscriber_id")?;
        let added = {
            let mut registry = self.shared.registry.lock();
            registry.record(data_id)?;
            registry.bindings.add_subscriber(data_id, subscriber_id)
        };
        if added {
            debug!(data_id, subscriber_id, "added subscriber");
            self.emit(vec![PoolEvent::SubscriberAdded {
                data_id: data_id.to_owned(),
                subscriber_id: subscriber_id.to_owned(),
            }]);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Record metadata. Refused while the record is locked.
    pub fn get_info(&self, data_id: &str) -> PoolResult<RecordInfo> {
        let record = self.shared.registry.lock().readable(data_id)?;
        let info = record.read().info();
        Ok(info)
    }

    fn admit(&self, data_id: &str, subscriber_id: &str) -> PoolResult<SharedRecord> {
        let registry = self.shared.registry.lock();
        let record = registry.readable(data_id)?;
        registry.bindings.require_subscriber(data_id, subscriber_id)?;
        Ok(record)
    }

    /// Read every element on behalf of `subscriber_id`, then acknowledge.
    pub fn get_data(&self, data_id: &str, subscriber_id: &str) -> PoolResult<Samples> {
        let record = self.admit(data_id, subscriber_id)?;
        let samples = record.read().read_all()?;
        self.acknowledge_read(data_id, subscriber_id)?;
        Ok(samples)
    }

    /// Non-overlapping chunks for `subscriber_id`; acknowledges when drained.
    pub fn get_chunk_generator(
        &self,
        data_id: &str,
        subscriber_id: &str,
        chunk_size: usize,
    ) -> PoolResult<PoolChunks> {
        let record = self.admit(data_id, subscriber_id)?;
        let chunks = record.read().read_sequential_chunks(chunk_size)?;
        debug!(data_id, subscriber_id, chunk_size, "opened chunk generator");
        Ok(PoolChunks::sequential(chunks, self.clone(), data_id, subscriber_id))
    }

    /// Overlapping windows for `subscriber_id`; acknowledges when drained.
    pub fn get_overlapped_chunk_generator(
        &self,
        data_id: &str,
        subscriber_id: &str,
        chunk_size: usize,
        overlap_percent: f64,
    ) -> PoolResult<PoolChunks> {
        let record = self.admit(data_id, subscriber_id)?;
        let chunks = record
            .read()
            .read_overlapped_chunks(chunk_size, overlap_percent)?;
        debug!(data_id, subscriber_id, chunk_size, overlap_percent, "opened overlapped chunk generator");
        Ok(PoolChunks::overlapped(chunks, self.clone(), data_id, subscriber_id))
    }

    /// Administrative random access. Needs no subscriber and acknowledges nothing.
    pub fn get_chunk_at(&self, data_id: &str, index: usize, chunk_size: usize) -> PoolResult<Samples> {
        let record = self.shared.registry.lock().readable(data_id)?;
        let chunk = record.read().read_chunk_at(index, chunk_size)?;
        Ok(chunk)
    }

    /// Resolve the members of an FFT collection. Released members resolve to `None`.
    pub fn resolve_fft_members(&self, data_id: &str) -> PoolResult<Vec<Option<RecordInfo>>> {
        let record = self.shared.registry.lock().readable(data_id)?;
        let member_ids = {
            let guard = record.read();
            let DataKind::FftCollection(collection) = guard.kind() else {
                return Err(PoolError::InvalidConfiguration(format!(
                    "data {data_id} is a {} record, not an fft_collection",
                    guard.tag()
                )));
            };
            collection.member_ids.clone()
        };
        let members: Vec<Option<SharedRecord>> = {
            let registry = self.shared.registry.lock();
            member_ids
                .iter()
                .map(|id| registry.records.get(id).cloned())
                .collect()
        };
        Ok(members
            .into_iter()
            .map(|member| member.map(|record| record.read().info()))
            .collect())
    }

    // ---------------------------------------------------------------------
    // Acknowledgment barrier
    // ---------------------------------------------------------------------

    /// Explicitly acknowledge `subscriber_id`. Returns whether the record was released.
    ///
    /// Acknowledging twice is a no-op. Refused while the record is locked.
    pub fn acknowledge(&self, data_id: &str, subscriber_id: &str) -> PoolResult<bool> {
        self.acknowledge_inner(data_id, subscriber_id, true)
    }

    /// Acknowledgment after a completed read; the record may have been
    /// re-locked since the read was admitted.
    pub(crate) fn acknowledge_read(&self, data_id: &str, subscriber_id: &str) -> PoolResult<bool> {
        self.acknowledge_inner(data_id, subscriber_id, false)
    }

    fn acknowledge_inner(
        &self,
        data_id: &str,
        subscriber_id: &str,
        require_unlocked: bool,
    ) -> PoolResult<bool> {
        let mut events = Vec::new();
        let released = {
            let mut registry = self.shared.registry.lock();
            let source = registry.bindings.source(data_id)?;
            if require_unlocked && source.locked {
                return Err(PoolError::Locked(data_id.to_owned()));
            }
            if registry.bindings.acknowledge(data_id, subscriber_id)? {
                events.push(PoolEvent::Acknowledged {
                    data_id: data_id.to_owned(),
                    subscriber_id: subscriber_id.to_owned(),
                });
            }
            let subscribers = registry.bindings.subscribers(data_id);
            if barrier::should_release(registry.bindings.source(data_id)?, subscribers) {
                registry.retire(data_id)
            } else {
                debug!(
                    data_id,
                    subscriber_id,
                    pending = ?barrier::pending(subscribers),
                    "acknowledged"
                );
                None
            }
        };

        let was_released = released.is_some();
        if let Some(record) = released {
            if let Err(e) = record.write().delete() {
                warn!(data_id, error = %e, "failed to free released data");
            }
            info!(data_id, "released data after final acknowledgment");
            events.push(PoolEvent::Released {
                data_id: data_id.to_owned(),
            });
        }
        self.emit(events);
        Ok(was_released)
    }

    // ---------------------------------------------------------------------
    // Conversion and deletion
    // ---------------------------------------------------------------------

    /// Move a record into memory. The record is locked for the duration.
    pub fn convert_to_ram(&self, data_id: &str) -> PoolResult<()> {
        self.convert(data_id, StorageMode::Ram, |record| record.convert_to_memory())
    }

    /// Move a record into `<folder>/<id>.<ext>`, falling back to the
    /// configured default folder. The record is locked for the duration.
    pub fn convert_to_file(&self, data_id: &str, folder: Option<&Path>) -> PoolResult<()> {
        let storage = &self.shared.config.storage;
        let folder = folder
            .map(Path::to_path_buf)
            .or_else(|| storage.default_folder.clone())
            .ok_or_else(|| {
                PoolError::InvalidConfiguration(
                    "converting to file storage needs a folder".into(),
                )
            })?;
        if storage.create_missing_folders && !folder.exists() {
            std::fs::create_dir_all(&folder)?;
        }
        validation::is_valid_folder(&folder)?;
        let extension = storage.file_extension.clone();
        self.convert(data_id, StorageMode::File, move |record| {
            record.convert_to_file(&folder, &extension)
        })
    }

    fn convert<F>(&self, data_id: &str, mode: StorageMode, migrate: F) -> PoolResult<()>
    where
        F: FnOnce(&mut DataRecord) -> PoolResult<()>,
    {
        let (record, was_locked) = self.shared.registry.lock().claim(data_id)?;
        let result = migrate(&mut *record.write());
        let settled = self.shared.registry.lock().settle(data_id, was_locked);
        result?;
        settled?;
        info!(data_id, %mode, "converted data");
        self.emit(vec![PoolEvent::Converted {
            data_id: data_id.to_owned(),
            mode,
        }]);
        Ok(())
    }

    /// Remove a record, its bindings and its backend.
    ///
    /// Returns `Ok(false)` without touching anything if the record is
    /// protected; unprotect it with [`DataPool::set_protected`] first. If the
    /// backend cannot be freed the record is still removed from the pool and
    /// the I/O error is returned.
    pub fn delete(&self, data_id: &str) -> PoolResult<bool> {
        let record = {
            let mut registry = self.shared.registry.lock();
            if registry.bindings.source(data_id)?.protected {
                None
            } else {
                registry.retire(data_id)
            }
        };
        let Some(record) = record else {
            warn!(data_id, "refused to delete protected data");
            self.emit(vec![PoolEvent::DeleteRefused {
                data_id: data_id.to_owned(),
            }]);
            return Ok(false);
        };
        let freed = record.write().delete();
        info!(data_id, "deleted data");
        self.emit(vec![PoolEvent::Deleted {
            data_id: data_id.to_owned(),
        }]);
        freed.map(|()| true)
    }

    // ---------------------------------------------------------------------
    // Inspection
    // ---------------------------------------------------------------------

    /// Lifecycle state. Identifiers that were released or deleted report `Released`.
    ///
    /// Retired identifiers are remembered for the life of the pool, so a
    /// long-running pool grows by one identifier per released record.
    pub fn state(&self, data_id: &str) -> PoolResult<RecordState> {
        let registry = self.shared.registry.lock();
        match registry.bindings.source(data_id) {
            Ok(binding) => Ok(RecordState::from_binding(binding)),
            Err(_) if registry.retired.contains(data_id) => Ok(RecordState::Released),
            Err(e) => Err(e),
        }
    }

    /// Copy of the record's source binding.
    pub fn source_binding(&self, data_id: &str) -> PoolResult<SourceBinding> {
        self.shared.registry.lock().bindings.source(data_id).cloned()
    }

    /// Copies of the record's subscriber bindings, in the order they were added.
    pub fn subscriber_bindings(&self, data_id: &str) -> PoolResult<Vec<SubscriberBinding>> {
        let registry = self.shared.registry.lock();
        registry.record(data_id)?;
        Ok(registry.bindings.subscribers(data_id).to_vec())
    }

    /// Metadata of every registered record, locked ones included, oldest first.
    #[must_use]
    pub fn list_records(&self) -> Vec<RecordInfo> {
        let records: Vec<SharedRecord> =
            self.shared.registry.lock().records.values().cloned().collect();
        let mut infos: Vec<RecordInfo> = records
            .iter()
            .map(|record| record.read().info())
            .collect();
        infos.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        infos
    }

    /// Number of registered records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.registry.lock().records.len()
    }

    /// Whether no record is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn constants(pool: &DataPool) -> String {
        pool.register(
            KindTag::Constants,
            "c",
            "src",
            false,
            StorageMode::Ram,
            KindParams::default(),
        )
        .unwrap()
    }

    #[test]
    fn registered_record_starts_locked() {
        let pool = DataPool::default();
        let id = constants(&pool);
        assert_eq!(pool.state(&id).unwrap(), RecordState::Locked);
        assert!(matches!(pool.get_info(&id), Err(PoolError::Locked(_))));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn store_requires_owner_and_lock() {
        let pool = DataPool::default();
        let id = constants(&pool);
        let err = pool.store(&id, vec![1.0f32], "intruder", None).unwrap_err();
        assert!(matches!(err, PoolError::Unauthorized(_)));

        pool.store(&id, vec![1.0f32], "src", None).unwrap();
        assert_eq!(pool.state(&id).unwrap(), RecordState::Unlocked);

        let err = pool.store(&id, vec![2.0f32], "src", None).unwrap_err();
        assert!(matches!(err, PoolError::Unauthorized(_)));
    }

    #[test]
    fn failed_store_stays_locked() {
        let pool = DataPool::default();
        let id = constants(&pool);
        let err = pool.store(&id, vec![1i32], "src", None).unwrap_err();
        assert!(err.is_format());
        assert_eq!(pool.state(&id).unwrap(), RecordState::Locked);
    }

    #[test]
    fn file_record_without_folder_is_rejected() {
        let pool = DataPool::default();
        let id = pool
            .register(
                KindTag::Integers,
                "ints",
                "src",
                false,
                StorageMode::File,
                KindParams::default(),
            )
            .unwrap();
        let err = pool.store(&id, vec![1i32, 2], "src", None).unwrap_err();
        assert!(matches!(err, PoolError::InvalidConfiguration(_)));
        assert_eq!(pool.state(&id).unwrap(), RecordState::Locked);
    }

    #[test]
    fn unknown_subscriber_cannot_read_or_acknowledge() {
        let pool = DataPool::default();
        let id = constants(&pool);
        pool.store(&id, vec![1.0f32], "src", None).unwrap();
        assert!(matches!(
            pool.get_data(&id, "ghost"),
            Err(PoolError::Unauthorized(_))
        ));
        assert!(matches!(
            pool.acknowledge(&id, "ghost"),
            Err(PoolError::Unauthorized(_))
        ));
    }

    #[test]
    fn get_chunk_at_does_not_acknowledge() {
        let pool = DataPool::default();
        let id = constants(&pool);
        pool.store(&id, vec![1.0f32, 2.0, 3.0], "src", None).unwrap();
        pool.add_subscriber(&id, "a").unwrap();
        assert_eq!(
            pool.get_chunk_at(&id, 1, 2).unwrap(),
            Samples::Float32(vec![3.0])
        );
        assert!(!pool.subscriber_bindings(&id).unwrap()[0].acknowledged);
    }

    #[test]
    fn released_ids_report_released_state() {
        let pool = DataPool::default();
        let id = constants(&pool);
        pool.store(&id, vec![1.0f32], "src", None).unwrap();
        pool.add_subscriber(&id, "a").unwrap();
        pool.get_data(&id, "a").unwrap();
        assert_eq!(pool.state(&id).unwrap(), RecordState::Released);
        assert!(matches!(pool.state("never"), Err(PoolError::NotFound(_))));
        assert!(pool.is_empty());
    }

    #[test]
    #[traced_test]
    fn release_is_logged() {
        let pool = DataPool::default();
        let id = constants(&pool);
        pool.store(&id, vec![1.0f32], "src", None).unwrap();
        pool.add_subscriber(&id, "a").unwrap();
        assert!(!logs_contain("released data after final acknowledgment"));
        pool.get_data(&id, "a").unwrap();
        assert!(logs_contain("released data after final acknowledgment"));
    }

    #[test]
    #[traced_test]
    fn protected_record_is_kept() {
        let pool = DataPool::default();
        let id = pool
            .register(
                KindTag::Constants,
                "c",
                "src",
                true,
                StorageMode::Ram,
                KindParams::default(),
            )
            .unwrap();
        pool.store(&id, vec![1.0f32], "src", None).unwrap();
        pool.add_subscriber(&id, "a").unwrap();
        pool.get_data(&id, "a").unwrap();
        assert_eq!(pool.state(&id).unwrap(), RecordState::Unlocked);

        assert!(!pool.delete(&id).unwrap());
        assert!(logs_contain("refused to delete protected data"));

        pool.set_protected(&id, "src", false).unwrap();
        assert!(pool.delete(&id).unwrap());
        assert!(logs_contain("deleted data"));
        assert_eq!(pool.state(&id).unwrap(), RecordState::Released);
    }
}
