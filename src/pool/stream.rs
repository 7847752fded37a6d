//! Subscriber-facing chunk iterator that acknowledges on exhaustion.

use crate::data::codec::Samples;
use crate::data::reader::{OverlappedChunks, SequentialChunks};
use crate::error::PoolResult;
use crate::pool::DataPool;

#[derive(Debug)]
enum Reader {
    Sequential(SequentialChunks),
    Overlapped(OverlappedChunks),
}

impl Reader {
    fn next_chunk(&mut self) -> Option<PoolResult<Samples>> {
        match self {
            Reader::Sequential(chunks) => chunks.next(),
            Reader::Overlapped(chunks) => chunks.next(),
        }
    }
}

/// Chunks of a record read on behalf of one subscriber.
///
/// When the underlying reader is drained the subscriber is acknowledged,
/// which may release the record. A read error ends the iteration without
/// acknowledging; so does dropping the iterator early. If the acknowledgment
/// itself fails, its error is yielded as the last item.
#[derive(Debug)]
pub struct PoolChunks {
    reader: Reader,
    pool: DataPool,
    data_id: String,
    subscriber_id: String,
    finished: bool,
}

impl PoolChunks {
    pub(crate) fn sequential(
        chunks: SequentialChunks,
        pool: DataPool,
        data_id: &str,
        subscriber_id: &str,
    ) -> Self {
        Self::new(Reader::Sequential(chunks), pool, data_id, subscriber_id)
    }

    pub(crate) fn overlapped(
        chunks: OverlappedChunks,
        pool: DataPool,
        data_id: &str,
        subscriber_id: &str,
    ) -> Self {
        Self::new(Reader::Overlapped(chunks), pool, data_id, subscriber_id)
    }

    fn new(reader: Reader, pool: DataPool, data_id: &str, subscriber_id: &str) -> Self {
        Self {
            reader,
            pool,
            data_id: data_id.to_owned(),
            subscriber_id: subscriber_id.to_owned(),
            finished: false,
        }
    }

    /// Record being read.
    #[must_use]
    pub fn data_id(&self) -> &str {
        &self.data_id
    }

    /// Subscriber that acknowledges on exhaustion.
    #[must_use]
    pub fn subscriber_id(&self) -> &str {
        &self.subscriber_id
    }
}

impl Iterator for PoolChunks {
    type Item = PoolResult<Samples>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.reader.next_chunk() {
            Some(Ok(chunk)) => Some(Ok(chunk)),
            Some(Err(e)) => {
                self.finished = true;
                Some(Err(e))
            }
            None => {
                self.finished = true;
                self.pool
                    .acknowledge_read(&self.data_id, &self.subscriber_id)
                    .err()
                    .map(Err)
            }
        }
    }
}

impl std::iter::FusedIterator for PoolChunks {}
