//! An in-process, multi-node cluster.
//!
//! [`LocalCluster`] allocates shard copies across nodes, routes documents to
//! their shard, and wires a [`TransportClassifyAction`] to a
//! [`LocalTransport`] so that every shard request crosses the wire format.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{info, warn};

use crate::action::{
    ClassifyConfig, ClassifyRequest, ClassifyResponse, SHARD_ACTION_NAME, ShardClassifyHandler,
    TransportClassifyAction,
};
use crate::analysis::AnalysisRegistry;
use crate::cluster::{
    ClusterBlock, ClusterService, ClusterState, DiscoveryNode, IndexMetadata, OperationRouting,
    ShardRouting, ShardRoutingState, StateBlockService,
};
use crate::document::StoredDocument;
use crate::error::{Result, SarissaError};
use crate::index::ShardId;
use crate::indices::IndicesService;
use crate::schema::IndexDefinition;
use crate::transport::{LocalTransport, Transport};

/// Builder for [`LocalCluster`].
#[derive(Debug)]
pub struct LocalClusterBuilder {
    nodes: usize,
    analysis: Option<AnalysisRegistry>,
    config: ClassifyConfig,
}

impl LocalClusterBuilder {
    pub fn nodes(mut self, nodes: usize) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn analysis(mut self, analysis: AnalysisRegistry) -> Self {
        self.analysis = Some(analysis);
        self
    }

    pub fn config(mut self, config: ClassifyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<LocalCluster> {
        if self.nodes == 0 {
            return Err(SarissaError::invalid_argument(
                "a cluster needs at least one node",
            ));
        }
        let analysis = Arc::new(match self.analysis {
            Some(analysis) => analysis,
            None => AnalysisRegistry::new()?,
        });

        let transport = Arc::new(LocalTransport::new());
        let mut state = ClusterState::new();
        let mut nodes = BTreeMap::new();
        for i in 0..self.nodes {
            let node_id = format!("node-{i}");
            let indices = Arc::new(IndicesService::new(node_id.as_str(), Arc::clone(&analysis)));
            transport.register_handler(
                node_id.as_str(),
                SHARD_ACTION_NAME,
                Arc::new(ShardClassifyHandler::new(Arc::clone(&indices))),
            );
            state.add_node(DiscoveryNode::new(node_id.as_str()));
            nodes.insert(node_id, indices);
        }

        let cluster = Arc::new(ClusterService::new(state));
        let action = TransportClassifyAction::new(
            Arc::clone(&cluster),
            Arc::new(OperationRouting::new()),
            Arc::new(StateBlockService),
            Arc::clone(&transport) as Arc<dyn Transport>,
            self.config,
        )?;
        info!("started local cluster with {} nodes", nodes.len());

        Ok(LocalCluster {
            cluster,
            transport,
            nodes,
            action,
        })
    }
}

/// Nodes, shards and a classify action living in one process.
#[derive(Debug)]
pub struct LocalCluster {
    cluster: Arc<ClusterService>,
    transport: Arc<LocalTransport>,
    nodes: BTreeMap<String, Arc<IndicesService>>,
    action: TransportClassifyAction,
}

impl LocalCluster {
    pub fn builder() -> LocalClusterBuilder {
        LocalClusterBuilder {
            nodes: 1,
            analysis: None,
            config: ClassifyConfig::default(),
        }
    }

    pub fn cluster_service(&self) -> &Arc<ClusterService> {
        &self.cluster
    }

    pub fn transport(&self) -> &Arc<LocalTransport> {
        &self.transport
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    pub fn indices(&self, node_id: &str) -> Option<&Arc<IndicesService>> {
        self.nodes.get(node_id)
    }

    pub fn action(&self) -> &TransportClassifyAction {
        &self.action
    }

    /// A classify action sending its shard requests through `transport`.
    pub fn classify_action_with(
        &self,
        transport: Arc<dyn Transport>,
        config: ClassifyConfig,
    ) -> Result<TransportClassifyAction> {
        TransportClassifyAction::new(
            Arc::clone(&self.cluster),
            Arc::new(OperationRouting::new()),
            Arc::new(StateBlockService),
            transport,
            config,
        )
    }

    /// Create an index, putting the primary of shard `s` on node
    /// `s % nodes` and its replicas on the nodes after it.
    pub fn create_index(&self, name: &str, definition: IndexDefinition) -> Result<()> {
        definition.validate()?;
        if self.cluster.state().has_index(name) {
            return Err(SarissaError::invalid_argument(format!(
                "index [{name}] already exists"
            )));
        }

        let schema = Arc::new(definition.schema());
        let node_ids = self.node_ids();
        let copies_per_shard = definition.settings.number_of_replicas as usize + 1;
        if copies_per_shard > node_ids.len() {
            warn!(
                "index [{name}] wants {copies_per_shard} copies per shard but only {} nodes exist",
                node_ids.len()
            );
        }

        let mut copies = Vec::new();
        for shard in 0..definition.settings.number_of_shards {
            let shard_id = ShardId::new(name, shard);
            for copy in 0..copies_per_shard.min(node_ids.len()) {
                let node_id = &node_ids[(shard as usize + copy) % node_ids.len()];
                self.nodes[node_id].create_shard(shard_id.clone(), Arc::clone(&schema))?;
                copies.push(ShardRouting::started(shard_id.clone(), node_id.as_str(), copy == 0));
            }
        }

        let metadata = IndexMetadata::new(name, definition.settings.clone(), schema);
        self.cluster
            .submit_state_update(&format!("create-index [{name}]"), move |state| {
                state.put_index(metadata);
                for copy in copies {
                    state.routing_table.add_copy(copy);
                }
            });
        Ok(())
    }

    /// Index `document` into every copy of the shard its routing key maps to.
    pub fn index(&self, index: &str, document: StoredDocument) -> Result<()> {
        let state = self.cluster.state();
        let metadata = state
            .metadata(index)
            .ok_or_else(|| SarissaError::index_not_found(index))?;
        let shard = OperationRouting::shard_id_for(document.routing_key(), metadata.number_of_shards());
        let shard_id = ShardId::new(index, shard);
        let group = state
            .routing_table
            .shard(&shard_id)
            .ok_or_else(|| SarissaError::shard_unavailable(format!("{shard_id} is not allocated")))?;

        for copy in &group.copies {
            if let Some(node_id) = copy.current_node_id() {
                if let Some(indices) = self.nodes.get(node_id) {
                    indices.shard(&shard_id)?.index(document.clone())?;
                }
            }
        }
        Ok(())
    }

    /// Make everything indexed so far visible to searches.
    pub fn refresh(&self, index: &str) -> Result<()> {
        for indices in self.nodes.values() {
            for shard_id in indices.shard_ids() {
                if shard_id.index == index {
                    indices.shard(&shard_id)?.refresh()?;
                }
            }
        }
        Ok(())
    }

    /// Block reads on `index`.
    pub fn close_index(&self, index: &str) {
        let index = index.to_string();
        self.cluster
            .submit_state_update(&format!("close-index [{index}]"), move |state| {
                state.blocks.add_index_block(index, ClusterBlock::index_closed());
            });
    }

    pub fn set_shard_state(&self, shard_id: &ShardId, node_id: &str, shard_state: ShardRoutingState) {
        let shard_id = shard_id.clone();
        let node_id = node_id.to_string();
        self.cluster
            .submit_state_update("shard-state-change", move |state| {
                state.routing_table.set_state(&shard_id, &node_id, shard_state);
            });
    }

    /// Drop a node's copy of a shard without telling the routing table.
    pub fn remove_shard_copy(&self, node_id: &str, shard_id: &ShardId) -> bool {
        self.nodes
            .get(node_id)
            .and_then(|indices| indices.remove_shard(shard_id))
            .is_some()
    }

    pub fn classify(&self, request: ClassifyRequest) -> Result<ClassifyResponse> {
        self.action.execute(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition(shards: u32, replicas: u32) -> IndexDefinition {
        serde_json::from_value(json!({
            "settings": {"number_of_shards": shards, "number_of_replicas": replicas},
            "mappings": {"doc": {"properties": {"body": {"type": "text"}}}}
        }))
        .unwrap()
    }

    #[test]
    fn test_allocation() {
        let cluster = LocalCluster::builder().nodes(3).build().unwrap();
        cluster.create_index("news", definition(3, 1)).unwrap();

        let state = cluster.cluster_service().state();
        let groups = state.routing_table.index("news").unwrap();
        assert_eq!(groups.len(), 3);
        for group in groups {
            let primary = group.primary().unwrap();
            let expected = format!("node-{}", group.shard_id.id);
            assert_eq!(primary.current_node_id(), Some(expected.as_str()));
            assert_eq!(group.active_shards().len(), 2);
        }
        assert_eq!(cluster.indices("node-0").unwrap().shard_ids().len(), 2);
        assert!(cluster.create_index("news", definition(1, 0)).is_err());
    }

    #[test]
    fn test_documents_land_on_every_copy() {
        let cluster = LocalCluster::builder().nodes(2).build().unwrap();
        cluster.create_index("news", definition(2, 1)).unwrap();
        for i in 0..10 {
            cluster
                .index("news", StoredDocument::new(i.to_string(), "doc", json!({"body": "hello"})))
                .unwrap();
        }
        cluster.refresh("news").unwrap();

        let total: u32 = cluster
            .indices("node-0")
            .unwrap()
            .shard_ids()
            .iter()
            .map(|id| cluster.indices("node-0").unwrap().shard(id).unwrap().num_docs())
            .sum();
        assert_eq!(total, 10);
        assert!(cluster.index("missing", StoredDocument::new("1", "doc", json!({}))).is_err());
    }

    #[test]
    fn test_needs_a_node() {
        assert!(LocalCluster::builder().nodes(0).build().is_err());
    }
}
