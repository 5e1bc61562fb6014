//! A single shard copy: a writer, its refreshed segments and searcher
//! accounting.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisRegistry;
use crate::document::StoredDocument;
use crate::error::{Result, SarissaError};
use crate::index::mapper::DocumentMapper;
use crate::index::reader::CompositeReader;
use crate::index::searcher::{Searcher, SearcherStats};
use crate::index::segment::{Segment, SegmentWriter};
use crate::schema::Schema;

/// Identifies a shard group: index name plus shard number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardId {
    pub index: String,
    pub id: u32,
}

impl ShardId {
    pub fn new<S: Into<String>>(index: S, id: u32) -> Self {
        ShardId {
            index: index.into(),
            id,
        }
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}][{}]", self.index, self.id)
    }
}

/// One copy of a shard held by a node.
pub struct IndexShard {
    shard_id: ShardId,
    mapper: DocumentMapper,
    analysis: Arc<AnalysisRegistry>,
    writer: Mutex<SegmentWriter>,
    segments: RwLock<Arc<Vec<Arc<Segment>>>>,
    stats: Arc<SearcherStats>,
    closed: AtomicBool,
}

impl IndexShard {
    pub fn new(shard_id: ShardId, schema: Arc<Schema>, analysis: Arc<AnalysisRegistry>) -> Self {
        IndexShard {
            shard_id,
            mapper: DocumentMapper::new(schema, Arc::clone(&analysis)),
            analysis,
            writer: Mutex::new(SegmentWriter::new()),
            segments: RwLock::new(Arc::new(Vec::new())),
            stats: Arc::new(SearcherStats::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn shard_id(&self) -> &ShardId {
        &self.shard_id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.mapper.schema()
    }

    pub fn analysis(&self) -> &Arc<AnalysisRegistry> {
        &self.analysis
    }

    pub fn mapper(&self) -> &DocumentMapper {
        &self.mapper
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SarissaError::shard_unavailable(format!(
                "{} is closed",
                self.shard_id
            )));
        }
        Ok(())
    }

    /// Parse and buffer a document; it becomes searchable after [`refresh`](Self::refresh).
    pub fn index(&self, document: StoredDocument) -> Result<()> {
        self.ensure_open()?;
        let parsed = self.mapper.parse(document)?;
        self.writer.lock().add_document(parsed);
        Ok(())
    }

    /// Publish buffered documents as a new segment.
    pub fn refresh(&self) -> Result<()> {
        self.ensure_open()?;
        let Some(segment) = self.writer.lock().flush() else {
            return Ok(());
        };

        let mut segments = self.segments.write();
        let mut next = Vec::with_capacity(segments.len() + 1);
        next.extend(segments.iter().cloned());
        next.push(Arc::new(segment));
        debug!("refreshed {}: {} segments", self.shard_id, next.len());
        *segments = Arc::new(next);
        Ok(())
    }

    /// Acquire a scoped snapshot of the currently visible segments.
    pub fn acquire_searcher(&self, source: &str) -> Result<Searcher> {
        self.ensure_open()?;
        let reader = CompositeReader::new(self.segments.read().clone());
        Ok(Searcher::new(
            source,
            self.shard_id.clone(),
            reader,
            Arc::clone(&self.stats),
        ))
    }

    /// Readers still holding the currently published segment list.
    pub fn pinned_snapshots(&self) -> usize {
        Arc::strong_count(&self.segments.read()) - 1
    }

    pub fn searcher_stats(&self) -> &Arc<SearcherStats> {
        &self.stats
    }

    /// Number of searchable documents.
    pub fn num_docs(&self) -> u32 {
        self.segments.read().iter().map(|s| s.max_doc()).sum()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for IndexShard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexShard")
            .field("shard_id", &self.shard_id)
            .field("num_docs", &self.num_docs())
            .field("closed", &self.is_closed())
            .finish()
    }
}
