//! Lazy chunk readers over a record's storage.
//!
//! Both readers own their data source: an `Arc` of the in-memory buffer or
//! a file handle opened when the reader was created. A reader therefore
//! never observes a record that is being rewritten or deleted behind it; it
//! keeps reading the representation it was opened on.
//!
//! File-backed numeric records are read with one bounded `read_exact` per
//! chunk, never by buffering the whole file. Text records have no fixed
//! element width, so their file is decoded once when the reader opens and
//! chunked from memory.

use crate::data::codec::{self, SampleType, Samples};
use crate::error::PoolResult;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::iter::FusedIterator;
use std::sync::Arc;

/// Where a reader pulls its elements from.
#[derive(Debug)]
pub(crate) enum ChunkSource {
    Memory(Arc<Samples>),
    File {
        file: File,
        sample_type: SampleType,
        width: usize,
        element_count: usize,
    },
}

impl ChunkSource {
    pub(crate) fn element_count(&self) -> usize {
        match self {
            ChunkSource::Memory(samples) => samples.len(),
            ChunkSource::File { element_count, .. } => *element_count,
        }
    }
}

/// Read `count` elements from the file's current position in one bounded read.
fn read_elements(
    file: &mut File,
    sample_type: SampleType,
    width: usize,
    count: usize,
) -> PoolResult<Samples> {
    let mut buf = vec![0u8; count * width];
    file.read_exact(&mut buf)?;
    codec::decode(sample_type, &buf)
}

/// Non-overlapping chunks of at most `chunk_size` elements, strictly forward.
#[derive(Debug)]
pub struct SequentialChunks {
    source: ChunkSource,
    chunk_size: usize,
    position: usize,
    done: bool,
}

impl SequentialChunks {
    pub(crate) fn new(source: ChunkSource, chunk_size: usize) -> Self {
        Self {
            source,
            chunk_size,
            position: 0,
            done: false,
        }
    }

    /// Number of elements not yet yielded.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.source.element_count().saturating_sub(self.position)
    }

    fn read_next(&mut self) -> PoolResult<Samples> {
        let count = self.chunk_size.min(self.remaining());
        let chunk = match &mut self.source {
            ChunkSource::Memory(samples) => samples.slice(self.position..self.position + count),
            ChunkSource::File {
                file,
                sample_type,
                width,
                ..
            } => read_elements(file, *sample_type, *width, count)?,
        };
        self.position += count;
        Ok(chunk)
    }
}

impl Iterator for SequentialChunks {
    type Item = PoolResult<Samples>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining() == 0 {
            self.done = true;
            return None;
        }
        let result = self.read_next();
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

impl FusedIterator for SequentialChunks {}

/// Windows of up to `chunk_size` elements whose starts advance by `step`.
///
/// A window is produced for every start position below the element count, so
/// the trailing windows get shorter as they run into the end of the record.
#[derive(Debug)]
pub struct OverlappedChunks {
    source: ChunkSource,
    chunk_size: usize,
    step: usize,
    start: usize,
    done: bool,
}

impl OverlappedChunks {
    pub(crate) fn new(source: ChunkSource, chunk_size: usize, step: usize) -> Self {
        Self {
            source,
            chunk_size,
            step,
            start: 0,
            done: false,
        }
    }

    /// Distance between consecutive window starts.
    #[must_use]
    pub fn step(&self) -> usize {
        self.step
    }

    fn read_next(&mut self) -> PoolResult<Samples> {
        let count = self
            .chunk_size
            .min(self.source.element_count().saturating_sub(self.start));
        let window = match &mut self.source {
            ChunkSource::Memory(samples) => samples.slice(self.start..self.start + count),
            ChunkSource::File {
                file,
                sample_type,
                width,
                ..
            } => {
                let window = read_elements(file, *sample_type, *width, count)?;
                // The cursor sits at start + count; pull it back so the next
                // window begins at start + step.
                if count > self.step {
                    let rewind = ((count - self.step) * *width) as i64;
                    file.seek(SeekFrom::Current(-rewind))?;
                }
                window
            }
        };
        self.start += self.step;
        Ok(window)
    }
}

impl Iterator for OverlappedChunks {
    type Item = PoolResult<Samples>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.start >= self.source.element_count() {
            self.done = true;
            return None;
        }
        let result = self.read_next();
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

impl FusedIterator for OverlappedChunks {}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(n: i32) -> ChunkSource {
        ChunkSource::Memory(Arc::new(Samples::Int32((0..n).collect())))
    }

    #[test]
    fn sequential_memory_chunks_cover_everything_once() {
        let chunks: Vec<Samples> = SequentialChunks::new(memory(10), 4)
            .collect::<PoolResult<_>>()
            .unwrap();
        assert_eq!(
            chunks,
            vec![
                Samples::Int32(vec![0, 1, 2, 3]),
                Samples::Int32(vec![4, 5, 6, 7]),
                Samples::Int32(vec![8, 9]),
            ]
        );
    }

    #[test]
    fn sequential_on_empty_source_yields_nothing() {
        let mut chunks = SequentialChunks::new(memory(0), 4);
        assert!(chunks.next().is_none());
        assert!(chunks.next().is_none());
    }

    #[test]
    fn overlapped_memory_windows() {
        let windows: Vec<Samples> = OverlappedChunks::new(memory(6), 4, 2)
            .collect::<PoolResult<_>>()
            .unwrap();
        assert_eq!(
            windows,
            vec![
                Samples::Int32(vec![0, 1, 2, 3]),
                Samples::Int32(vec![2, 3, 4, 5]),
                Samples::Int32(vec![4, 5]),
            ]
        );
    }
}
