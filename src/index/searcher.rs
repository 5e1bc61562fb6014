//! Point-in-time searchers.
//!
//! [`Searcher`] is the scoped handle returned by
//! [`IndexShard::acquire_searcher`](crate::index::shard::IndexShard::acquire_searcher):
//! it pins the segments visible at acquisition and is released exactly once,
//! when dropped. [`IndexSearcher`] executes queries against a flat leaf view.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bit_vec::BitVec;
use log::trace;

use crate::error::Result;
use crate::index::reader::{CompositeReader, LeafReader};
use crate::index::shard::ShardId;
use crate::query::Query;
use crate::query::collector::{TopDocs, TopDocsCollector};

/// Acquire/release counters of one shard.
#[derive(Debug, Default)]
pub struct SearcherStats {
    acquired: AtomicU64,
    released: AtomicU64,
}

impl SearcherStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquired(&self) -> u64 {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }

    /// Searchers acquired but not yet released.
    pub fn open(&self) -> u64 {
        self.acquired().saturating_sub(self.released())
    }
}

/// A scoped read snapshot of a shard.
#[derive(Debug)]
pub struct Searcher {
    source: String,
    shard_id: ShardId,
    reader: CompositeReader,
    stats: Arc<SearcherStats>,
}

impl Searcher {
    pub(crate) fn new(
        source: &str,
        shard_id: ShardId,
        reader: CompositeReader,
        stats: Arc<SearcherStats>,
    ) -> Self {
        stats.acquired.fetch_add(1, Ordering::SeqCst);
        trace!("acquired searcher [{source}] on {shard_id}");
        Searcher {
            source: source.to_string(),
            shard_id,
            reader,
            stats,
        }
    }

    /// Name of the operation that acquired this searcher.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn shard_id(&self) -> &ShardId {
        &self.shard_id
    }

    pub fn reader(&self) -> &CompositeReader {
        &self.reader
    }

    /// A flat view over every segment of the snapshot.
    pub fn leaf_reader(&self) -> LeafReader {
        LeafReader::wrap(&self.reader)
    }
}

impl Drop for Searcher {
    fn drop(&mut self) {
        self.stats.released.fetch_add(1, Ordering::SeqCst);
        trace!("released searcher [{}] on {}", self.source, self.shard_id);
    }
}

/// Executes queries against a leaf reader.
#[derive(Debug, Clone)]
pub struct IndexSearcher {
    reader: LeafReader,
}

impl IndexSearcher {
    pub fn new(reader: LeafReader) -> Self {
        IndexSearcher { reader }
    }

    pub fn reader(&self) -> &LeafReader {
        &self.reader
    }

    /// The `n` best hits of `query`.
    pub fn search(&self, query: &dyn Query, n: usize) -> Result<TopDocs> {
        let mut collector = TopDocsCollector::new(n);
        let mut matcher = query.matcher(&self.reader)?;
        while !matcher.is_exhausted() {
            collector.collect(matcher.doc_id(), matcher.score());
            if !matcher.next()? {
                break;
            }
        }
        Ok(collector.top_docs())
    }

    /// Number of documents matching `query`.
    pub fn count(&self, query: &dyn Query) -> Result<usize> {
        let mut matcher = query.matcher(&self.reader)?;
        let mut count = 0;
        while !matcher.is_exhausted() {
            count += 1;
            if !matcher.next()? {
                break;
            }
        }
        Ok(count)
    }

    /// The documents matching `query` as a bitset over `max_doc`.
    pub fn filter_bits(&self, query: &dyn Query) -> Result<BitVec> {
        let mut bits = BitVec::from_elem(self.reader.max_doc() as usize, false);
        let mut matcher = query.matcher(&self.reader)?;
        while !matcher.is_exhausted() {
            bits.set(matcher.doc_id() as usize, true);
            if !matcher.next()? {
                break;
            }
        }
        Ok(bits)
    }
}
