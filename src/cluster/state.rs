//! Cluster state snapshots and the service that publishes them.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::cluster::block::ClusterBlocks;
use crate::cluster::routing::RoutingTable;
use crate::schema::{IndexSettings, Schema};

/// A member of the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryNode {
    pub id: String,
    pub name: String,
}

impl DiscoveryNode {
    pub fn new<S: Into<String>>(id: S) -> Self {
        let id = id.into();
        DiscoveryNode {
            name: id.clone(),
            id,
        }
    }
}

/// Settings and mappings of one index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMetadata {
    pub name: String,
    pub settings: IndexSettings,
    pub schema: Arc<Schema>,
}

impl IndexMetadata {
    pub fn new<S: Into<String>>(name: S, settings: IndexSettings, schema: Arc<Schema>) -> Self {
        IndexMetadata {
            name: name.into(),
            settings,
            schema,
        }
    }

    pub fn number_of_shards(&self) -> u32 {
        self.settings.number_of_shards
    }

    pub fn number_of_replicas(&self) -> u32 {
        self.settings.number_of_replicas
    }
}

/// An immutable view of the cluster.
#[derive(Debug, Clone, Default)]
pub struct ClusterState {
    pub version: u64,
    pub nodes: BTreeMap<String, DiscoveryNode>,
    pub indices: BTreeMap<String, IndexMetadata>,
    pub routing_table: RoutingTable,
    pub blocks: ClusterBlocks,
}

impl ClusterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: DiscoveryNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn node(&self, id: &str) -> Option<&DiscoveryNode> {
        self.nodes.get(id)
    }

    pub fn put_index(&mut self, metadata: IndexMetadata) {
        self.indices.insert(metadata.name.clone(), metadata);
    }

    pub fn metadata(&self, index: &str) -> Option<&IndexMetadata> {
        self.indices.get(index)
    }

    pub fn has_index(&self, index: &str) -> bool {
        self.indices.contains_key(index)
    }
}

/// Holds the current cluster state and applies updates to it.
#[derive(Debug, Default)]
pub struct ClusterService {
    state: RwLock<Arc<ClusterState>>,
}

impl ClusterService {
    pub fn new(initial: ClusterState) -> Self {
        ClusterService {
            state: RwLock::new(Arc::new(initial)),
        }
    }

    /// The current state; later updates do not affect the returned snapshot.
    pub fn state(&self) -> Arc<ClusterState> {
        self.state.read().clone()
    }

    /// Apply `update` to a copy of the current state and publish it.
    pub fn submit_state_update<F>(&self, source: &str, update: F)
    where
        F: FnOnce(&mut ClusterState),
    {
        let mut current = self.state.write();
        let mut next = ClusterState::clone(&current);
        update(&mut next);
        next.version = current.version + 1;
        debug!("publishing cluster state version [{}] ({source})", next.version);
        *current = Arc::new(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updates_publish_new_versions() {
        let service = ClusterService::new(ClusterState::new());
        let before = service.state();

        service.submit_state_update("add node", |state| {
            state.add_node(DiscoveryNode::new("n0"));
        });

        let after = service.state();
        assert_eq!(before.version, 0);
        assert!(before.node("n0").is_none());
        assert_eq!(after.version, 1);
        assert_eq!(after.node("n0").unwrap().name, "n0");
    }
}
