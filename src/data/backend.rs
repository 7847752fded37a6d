//! Storage backend for a single record: an in-memory buffer or one binary file.
//!
//! A [`RecordStore`] owns exactly one representation at a time. Writes to a
//! file go to a `<name>.partial` sibling first and are renamed over the
//! destination only once every chunk has been encoded and flushed, so a failed
//! write or conversion leaves the previous contents readable and unchanged.

use crate::data::codec::{self, SampleType, Samples, StreamEncoder};
use crate::data::reader::{ChunkSource, OverlappedChunks, SequentialChunks};
use crate::error::{PoolError, PoolResult};
use crate::validation;
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Where a record keeps its elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Decoded elements in memory.
    Ram,
    /// Packed elements in `<folder>/<id>.<ext>`.
    File,
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::Ram => f.write_str("ram"),
            StorageMode::File => f.write_str("file"),
        }
    }
}

/// The active representation of a record's elements.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    /// Decoded elements held in memory. Shared with open readers.
    InMemory(Arc<Samples>),
    /// Packed elements in a single file. `path` is `None` until the first write.
    OnDisk {
        /// Backing file.
        path: Option<PathBuf>,
        /// Bytes written to the file.
        byte_length: u64,
    },
    /// Resources were freed by `delete`; nothing can be read any more.
    Released,
}

/// Typed storage for one record.
#[derive(Debug)]
pub struct RecordStore {
    sample_type: SampleType,
    element_count: usize,
    byte_length: u64,
    backend: StorageBackend,
}

impl RecordStore {
    /// An empty store of the given type and mode.
    #[must_use]
    pub fn new(sample_type: SampleType, mode: StorageMode) -> Self {
        let backend = match mode {
            StorageMode::Ram => StorageBackend::InMemory(Arc::new(Samples::empty(sample_type))),
            StorageMode::File => StorageBackend::OnDisk {
                path: None,
                byte_length: 0,
            },
        };
        Self {
            sample_type,
            element_count: 0,
            byte_length: 0,
            backend,
        }
    }

    /// Adopt an existing record file whose sample type is known.
    ///
    /// The file carries no metadata, so the element count is derived from its
    /// length (or, for text, by decoding it).
    pub fn open_file(path: &Path, sample_type: SampleType) -> PoolResult<Self> {
        let byte_length = fs::metadata(path)?.len();
        let element_count = match sample_type.width() {
            Some(width) => {
                if byte_length % width as u64 != 0 {
                    return Err(PoolError::Format(format!(
                        "{} is {byte_length} bytes, not a multiple of the {sample_type} width ({width})",
                        path.display()
                    )));
                }
                (byte_length / width as u64) as usize
            }
            None => codec::decode(sample_type, &fs::read(path)?)?.len(),
        };
        Ok(Self {
            sample_type,
            element_count,
            byte_length,
            backend: StorageBackend::OnDisk {
                path: Some(path.to_path_buf()),
                byte_length,
            },
        })
    }

    /// Element type.
    #[must_use]
    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    /// Number of stored elements.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// Encoded size of the stored elements.
    #[must_use]
    pub fn byte_length(&self) -> u64 {
        self.byte_length
    }

    /// The active representation.
    #[must_use]
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    /// Current mode, or `None` once the store has been released.
    #[must_use]
    pub fn mode(&self) -> Option<StorageMode> {
        match self.backend {
            StorageBackend::InMemory(_) => Some(StorageMode::Ram),
            StorageBackend::OnDisk { .. } => Some(StorageMode::File),
            StorageBackend::Released => None,
        }
    }

    /// Path of the backing file, if the store is file-backed and written.
    #[must_use]
    pub fn file_path(&self) -> Option<&Path> {
        match &self.backend {
            StorageBackend::OnDisk { path, .. } => path.as_deref(),
            _ => None,
        }
    }

    /// Whether `delete` has freed the backend.
    #[must_use]
    pub fn is_released(&self) -> bool {
        matches!(self.backend, StorageBackend::Released)
    }

    fn released_error(&self) -> PoolError {
        PoolError::NotFound("storage backend has been released".into())
    }

    /// Replace the contents with the concatenation of `chunks`.
    ///
    /// For a file-backed store `destination` names the file to write; when it
    /// is `None` the current file path is reused. Counts reflect what was
    /// actually written. Any failure (I/O, or a chunk of the wrong sample
    /// type) leaves the previous contents in place.
    pub fn write_from_iterator<I>(&mut self, chunks: I, destination: Option<&Path>) -> PoolResult<()>
    where
        I: IntoIterator<Item = Samples>,
    {
        match &self.backend {
            StorageBackend::Released => Err(self.released_error()),
            StorageBackend::InMemory(_) => {
                let mut buffer = Samples::empty(self.sample_type);
                for chunk in chunks {
                    chunk.ensure_type(self.sample_type)?;
                    buffer.append(chunk)?;
                }
                self.element_count = buffer.len();
                self.byte_length = buffer.encoded_len() as u64;
                self.backend = StorageBackend::InMemory(Arc::new(buffer));
                Ok(())
            }
            StorageBackend::OnDisk { path, .. } => {
                let target = match destination.or(path.as_deref()) {
                    Some(target) => target.to_path_buf(),
                    None => {
                        return Err(PoolError::InvalidConfiguration(
                            "file-backed storage needs a destination folder".into(),
                        ))
                    }
                };
                let previous = path.clone();
                let (count, bytes) = write_file(self.sample_type, chunks, &target)?;
                if let Some(old) = previous.filter(|old| *old != target) {
                    remove_quietly(&old);
                }
                self.element_count = count;
                self.byte_length = bytes;
                self.backend = StorageBackend::OnDisk {
                    path: Some(target),
                    byte_length: bytes,
                };
                Ok(())
            }
        }
    }

    /// Replace the contents with one materialized collection.
    pub fn write_whole(&mut self, samples: Samples, destination: Option<&Path>) -> PoolResult<()> {
        self.write_from_iterator(std::iter::once(samples), destination)
    }

    /// Every element, decoded, in storage order.
    pub fn read_all(&self) -> PoolResult<Samples> {
        match &self.backend {
            StorageBackend::Released => Err(self.released_error()),
            StorageBackend::InMemory(samples) => Ok(samples.as_ref().clone()),
            StorageBackend::OnDisk { path: None, .. } => Ok(Samples::empty(self.sample_type)),
            StorageBackend::OnDisk {
                path: Some(path), ..
            } => codec::decode(self.sample_type, &fs::read(path)?),
        }
    }

    /// Open an independent source for a reader.
    ///
    /// Text files are decoded whole, since text elements have no fixed width
    /// to seek by.
    fn chunk_source(&self) -> PoolResult<ChunkSource> {
        match &self.backend {
            StorageBackend::Released => Err(self.released_error()),
            StorageBackend::InMemory(samples) => Ok(ChunkSource::Memory(Arc::clone(samples))),
            StorageBackend::OnDisk { path: None, .. } => Ok(ChunkSource::Memory(Arc::new(
                Samples::empty(self.sample_type),
            ))),
            StorageBackend::OnDisk {
                path: Some(path), ..
            } => match self.sample_type.width() {
                Some(width) => Ok(ChunkSource::File {
                    file: File::open(path)?,
                    sample_type: self.sample_type,
                    width,
                    element_count: self.element_count,
                }),
                None => Ok(ChunkSource::Memory(Arc::new(self.read_all()?))),
            },
        }
    }

    /// Lazy non-overlapping chunks of at most `chunk_size` elements.
    pub fn read_sequential_chunks(&self, chunk_size: usize) -> PoolResult<SequentialChunks> {
        validation::is_valid_chunk_size(chunk_size)?;
        let source = self.chunk_source()?;
        debug!(chunk_size, elements = self.element_count, "opened sequential reader");
        Ok(SequentialChunks::new(source, chunk_size))
    }

    /// Lazy windows of up to `chunk_size` elements, each starting
    /// `floor(chunk_size * (1 - overlap_percent / 100))` elements after the last.
    pub fn read_overlapped_chunks(
        &self,
        chunk_size: usize,
        overlap_percent: f64,
    ) -> PoolResult<OverlappedChunks> {
        let step = validation::overlap_step(chunk_size, overlap_percent)?;
        let source = self.chunk_source()?;
        debug!(chunk_size, step, elements = self.element_count, "opened overlapped reader");
        Ok(OverlappedChunks::new(source, chunk_size, step))
    }

    /// Chunk number `index` of size `chunk_size`; empty when past the end.
    pub fn read_chunk_at(&self, index: usize, chunk_size: usize) -> PoolResult<Samples> {
        validation::is_valid_chunk_size(chunk_size)?;
        let path = match &self.backend {
            StorageBackend::Released => return Err(self.released_error()),
            StorageBackend::OnDisk {
                path: Some(path), ..
            } => path,
            StorageBackend::InMemory(_) | StorageBackend::OnDisk { path: None, .. } => {
                return self.slice_chunk(index, chunk_size)
            }
        };
        let Some(width) = self.sample_type.width() else {
            return self.slice_chunk(index, chunk_size);
        };

        let offset = index
            .checked_mul(chunk_size)
            .and_then(|n| n.checked_mul(width))
            .map(|n| n as u64);
        let remaining = match offset {
            Some(offset) if offset < self.byte_length => self.byte_length - offset,
            _ => return Ok(Samples::empty(self.sample_type)),
        };
        let to_read = remaining.min(chunk_size.saturating_mul(width) as u64);

        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset.unwrap_or(0)))?;
        let mut buf = vec![0u8; to_read as usize];
        file.read_exact(&mut buf)?;
        codec::decode(self.sample_type, &buf)
    }

    fn slice_chunk(&self, index: usize, chunk_size: usize) -> PoolResult<Samples> {
        let Some(start) = index.checked_mul(chunk_size) else {
            return Ok(Samples::empty(self.sample_type));
        };
        let all = match &self.backend {
            StorageBackend::InMemory(samples) => Arc::clone(samples),
            _ => Arc::new(self.read_all()?),
        };
        Ok(all.slice(start..start.saturating_add(chunk_size)))
    }

    /// Move the contents into the file at `path`.
    ///
    /// No-op if the store is already file-backed. On failure the in-memory
    /// buffer stays active.
    pub fn convert_to_file(&mut self, path: &Path) -> PoolResult<()> {
        let samples = match &self.backend {
            StorageBackend::Released => return Err(self.released_error()),
            StorageBackend::OnDisk { .. } => return Ok(()),
            StorageBackend::InMemory(samples) => Arc::clone(samples),
        };
        let (count, bytes) = write_file(
            self.sample_type,
            std::iter::once(samples.as_ref().clone()),
            path,
        )?;
        self.element_count = count;
        self.byte_length = bytes;
        self.backend = StorageBackend::OnDisk {
            path: Some(path.to_path_buf()),
            byte_length: bytes,
        };
        Ok(())
    }

    /// Load the file into memory and remove it.
    ///
    /// No-op if the store is already in memory. If the file cannot be read
    /// the store stays file-backed. Failing to remove the old file afterwards
    /// is logged, not returned.
    pub fn convert_to_memory(&mut self) -> PoolResult<()> {
        let old_path = match &self.backend {
            StorageBackend::Released => return Err(self.released_error()),
            StorageBackend::InMemory(_) => return Ok(()),
            StorageBackend::OnDisk { path, .. } => path.clone(),
        };
        let samples = self.read_all()?;
        self.element_count = samples.len();
        self.byte_length = samples.encoded_len() as u64;
        self.backend = StorageBackend::InMemory(Arc::new(samples));
        if let Some(old) = old_path {
            remove_quietly(&old);
        }
        Ok(())
    }

    /// Free the buffer or remove the file. Calling it again is a no-op.
    ///
    /// Readers opened earlier keep their own handle and are unaffected on
    /// platforms that allow unlinking open files.
    pub fn delete(&mut self) -> PoolResult<()> {
        if let StorageBackend::OnDisk {
            path: Some(path), ..
        } = &self.backend
        {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.backend = StorageBackend::Released;
        self.element_count = 0;
        self.byte_length = 0;
        Ok(())
    }
}

/// Sibling path used while a file write is in progress.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove old record file");
        }
    }
}

/// Encode `chunks` into `target` through a partial file, returning
/// `(elements, bytes)` written. The partial file is removed on failure.
fn write_file<I>(sample_type: SampleType, chunks: I, target: &Path) -> PoolResult<(usize, u64)>
where
    I: IntoIterator<Item = Samples>,
{
    let partial = partial_path(target);
    match stream_to(sample_type, chunks, &partial).and_then(|written| {
        fs::rename(&partial, target)?;
        Ok(written)
    }) {
        Ok(written) => Ok(written),
        Err(e) => {
            remove_quietly(&partial);
            Err(e)
        }
    }
}

fn stream_to<I>(sample_type: SampleType, chunks: I, path: &Path) -> PoolResult<(usize, u64)>
where
    I: IntoIterator<Item = Samples>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    let mut encoder = StreamEncoder::new(sample_type);
    let mut buf = BytesMut::new();
    let mut count = 0usize;
    let mut bytes = 0u64;
    for chunk in chunks {
        chunk.ensure_type(sample_type)?;
        encoder.encode_into(&chunk, &mut buf);
        writer.write_all(&buf)?;
        count += chunk.len();
        bytes += buf.len() as u64;
        buf.clear();
    }
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok((count, bytes))
}
