//! In-memory inverted index: document mapping, segments, readers and shards.

pub mod mapper;
pub mod reader;
pub mod searcher;
pub mod segment;
pub mod shard;

pub use reader::{CompositeReader, LeafReader};
pub use searcher::{IndexSearcher, Searcher};
pub use segment::{DocId, FieldStats, Posting, Segment};
pub use shard::{IndexShard, ShardId};
