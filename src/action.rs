//! The classify action: request and response envelopes, the shard-level
//! messages and the coordinator that fans a request out over a cluster.

pub mod config;
pub mod coordinator;
pub mod request;
pub mod response;
pub mod shard;

pub use config::ClassifyConfig;
pub use coordinator::{ACTION_NAME, ClassifyTask, TransportClassifyAction};
pub use request::{ClassifyRequest, ClassifyRequestBuilder, DEFAULT_TOP_N};
pub use response::{ClassifyResponse, ShardFailure};
pub use shard::{
    SHARD_ACTION_NAME, ShardClassifyHandler, ShardClassifyRequest, ShardClassifyResponse,
    ShardTarget,
};
