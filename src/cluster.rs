//! Cluster state: nodes, index metadata, shard routing and blocks.

pub mod block;
pub mod routing;
pub mod state;

pub use block::{ClusterBlock, ClusterBlockLevel, ClusterBlockService, ClusterBlocks, StateBlockService};
pub use routing::{
    GroupShardsIterator, OperationRouting, RoutingResolver, RoutingTable, ShardIterator, ShardRouting,
    ShardRoutingState,
};
pub use state::{ClusterService, ClusterState, DiscoveryNode, IndexMetadata};
