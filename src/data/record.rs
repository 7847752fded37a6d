//! A typed, named record: one [`RecordStore`] plus its [`DataKind`].

use crate::data::backend::{RecordStore, StorageMode};
use crate::data::codec::{SampleType, Samples};
use crate::data::kind::{DataKind, KindTag};
use crate::data::reader::{OverlappedChunks, SequentialChunks};
use crate::error::{PoolError, PoolResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Streaming access to a record's elements.
pub trait Streamable {
    /// Non-overlapping chunks of at most `chunk_size` elements.
    fn read_sequential_chunks(&self, chunk_size: usize) -> PoolResult<SequentialChunks>;

    /// Overlapping windows; see [`RecordStore::read_overlapped_chunks`].
    fn read_overlapped_chunks(
        &self,
        chunk_size: usize,
        overlap_percent: f64,
    ) -> PoolResult<OverlappedChunks>;

    /// Chunk number `index`, empty when past the end.
    fn read_chunk_at(&self, index: usize, chunk_size: usize) -> PoolResult<Samples>;
}

/// Migration between the in-memory and on-disk representations.
pub trait Convertible {
    /// Move the elements into `<folder>/<id>.<extension>`.
    fn convert_to_file(&mut self, folder: &Path, extension: &str) -> PoolResult<()>;

    /// Load the elements into memory and remove the file.
    fn convert_to_memory(&mut self) -> PoolResult<()>;
}

/// Metadata snapshot returned by `get_info` and `list_records`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordInfo {
    /// Pool-assigned identifier.
    pub id: String,
    /// Name given at registration.
    pub name: String,
    /// Kind and its metadata.
    pub kind: DataKind,
    /// Element type.
    pub sample_type: SampleType,
    /// Number of stored elements.
    pub element_count: usize,
    /// Encoded size in bytes.
    pub byte_length: u64,
    /// `None` once the backend is released.
    pub storage_mode: Option<StorageMode>,
    /// Backing file of a written file record.
    pub file_path: Option<PathBuf>,
    /// Registration time.
    pub registered_at: DateTime<Utc>,
}

/// A record held by the pool.
#[derive(Debug)]
pub struct DataRecord {
    id: String,
    name: String,
    kind: DataKind,
    store: RecordStore,
    registered_at: DateTime<Utc>,
}

impl DataRecord {
    /// An empty record. RAM-only kinds refuse `StorageMode::File`.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: DataKind,
        sample_type: SampleType,
        mode: StorageMode,
    ) -> PoolResult<Self> {
        if mode == StorageMode::File && kind.tag().is_ram_only() {
            return Err(PoolError::InvalidConfiguration(format!(
                "{} records can only be stored in RAM",
                kind.tag()
            )));
        }
        Ok(Self {
            id: id.into(),
            name: name.into(),
            kind,
            store: RecordStore::new(sample_type, mode),
            registered_at: Utc::now(),
        })
    }

    /// Pool-assigned identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name given at registration.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind and its metadata.
    #[must_use]
    pub fn kind(&self) -> &DataKind {
        &self.kind
    }

    /// Name of the record's kind.
    #[must_use]
    pub fn tag(&self) -> KindTag {
        self.kind.tag()
    }

    /// The storage engine behind this record.
    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Snapshot of the record's metadata.
    #[must_use]
    pub fn info(&self) -> RecordInfo {
        RecordInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind.clone(),
            sample_type: self.store.sample_type(),
            element_count: self.store.element_count(),
            byte_length: self.store.byte_length(),
            storage_mode: self.store.mode(),
            file_path: self.store.file_path().map(Path::to_path_buf),
            registered_at: self.registered_at,
        }
    }

    /// `<folder>/<id>.<extension>`
    #[must_use]
    pub fn file_name(&self, folder: &Path, extension: &str) -> PathBuf {
        folder.join(format!("{}.{}", self.id, extension))
    }

    fn destination(&self, folder: Option<&Path>, extension: &str) -> Option<PathBuf> {
        match self.store.mode() {
            Some(StorageMode::File) => folder.map(|f| self.file_name(f, extension)),
            _ => None,
        }
    }

    /// Replace the record's elements with `samples`.
    ///
    /// Kinds that derive metadata from their payload parse it first, so a
    /// malformed payload leaves both the data and the kind untouched.
    pub fn store_samples(
        &mut self,
        samples: Samples,
        folder: Option<&Path>,
        extension: &str,
    ) -> PoolResult<()> {
        samples.ensure_type(self.store.sample_type())?;
        let parsed = self.kind.parse_payload(&samples)?;
        let destination = self.destination(folder, extension);
        self.store.write_whole(samples, destination.as_deref())?;
        if let Some(kind) = parsed {
            self.kind = kind;
        }
        Ok(())
    }

    /// Replace the record's elements with the concatenation of `chunks`.
    pub fn store_chunks<I>(&mut self, chunks: I, folder: Option<&Path>, extension: &str) -> PoolResult<()>
    where
        I: IntoIterator<Item = Samples>,
    {
        if self.tag().is_structured() {
            let mut whole = Samples::empty(self.store.sample_type());
            for chunk in chunks {
                whole.append(chunk)?;
            }
            return self.store_samples(whole, folder, extension);
        }
        let destination = self.destination(folder, extension);
        self.store.write_from_iterator(chunks, destination.as_deref())
    }

    /// Apply an edit to the kind metadata.
    ///
    /// The edit may not change the kind itself. For kinds whose metadata is
    /// their content, the stored elements are rewritten to match once the
    /// record has a place to write to.
    pub fn update_kind<F>(&mut self, edit: F) -> PoolResult<()>
    where
        F: FnOnce(&mut DataKind) -> PoolResult<()>,
    {
        let mut updated = self.kind.clone();
        edit(&mut updated)?;
        if updated.tag() != self.kind.tag() {
            return Err(PoolError::InvalidConfiguration(format!(
                "cannot change a {} record into {}",
                self.kind.tag(),
                updated.tag()
            )));
        }
        let writable = !(self.store.mode() == Some(StorageMode::File) && self.store.file_path().is_none());
        if let Some(content) = updated.content_samples().filter(|_| writable) {
            self.store.write_whole(content, None)?;
        }
        self.kind = updated;
        Ok(())
    }

    /// Every element, decoded.
    pub fn read_all(&self) -> PoolResult<Samples> {
        self.store.read_all()
    }

    /// Release the backend. Idempotent.
    pub fn delete(&mut self) -> PoolResult<()> {
        self.store.delete()
    }
}

impl Streamable for DataRecord {
    fn read_sequential_chunks(&self, chunk_size: usize) -> PoolResult<SequentialChunks> {
        self.store.read_sequential_chunks(chunk_size)
    }

    fn read_overlapped_chunks(
        &self,
        chunk_size: usize,
        overlap_percent: f64,
    ) -> PoolResult<OverlappedChunks> {
        self.store.read_overlapped_chunks(chunk_size, overlap_percent)
    }

    fn read_chunk_at(&self, index: usize, chunk_size: usize) -> PoolResult<Samples> {
        self.store.read_chunk_at(index, chunk_size)
    }
}

impl Convertible for DataRecord {
    fn convert_to_file(&mut self, folder: &Path, extension: &str) -> PoolResult<()> {
        if self.tag().is_ram_only() {
            return Err(PoolError::InvalidConfiguration(format!(
                "{} records can only be stored in RAM",
                self.tag()
            )));
        }
        let path = self.file_name(folder, extension);
        self.store.convert_to_file(&path)
    }

    fn convert_to_memory(&mut self) -> PoolResult<()> {
        self.store.convert_to_memory()
    }
}
