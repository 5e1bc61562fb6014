//! Per-node registry of shard copies.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::info;
use parking_lot::RwLock;

use crate::analysis::AnalysisRegistry;
use crate::error::{Result, SarissaError};
use crate::index::shard::{IndexShard, ShardId};
use crate::schema::Schema;

/// The shards held by one node.
#[derive(Debug)]
pub struct IndicesService {
    node_id: String,
    analysis: Arc<AnalysisRegistry>,
    shards: RwLock<BTreeMap<ShardId, Arc<IndexShard>>>,
}

impl IndicesService {
    pub fn new<S: Into<String>>(node_id: S, analysis: Arc<AnalysisRegistry>) -> Self {
        IndicesService {
            node_id: node_id.into(),
            analysis,
            shards: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn analysis(&self) -> &Arc<AnalysisRegistry> {
        &self.analysis
    }

    /// Allocate a new empty shard copy on this node.
    pub fn create_shard(&self, shard_id: ShardId, schema: Arc<Schema>) -> Result<Arc<IndexShard>> {
        let mut shards = self.shards.write();
        if shards.contains_key(&shard_id) {
            return Err(SarissaError::invalid_argument(format!(
                "shard {shard_id} already exists on node [{}]",
                self.node_id
            )));
        }
        let shard = Arc::new(IndexShard::new(
            shard_id.clone(),
            schema,
            Arc::clone(&self.analysis),
        ));
        info!("[{}] created shard {shard_id}", self.node_id);
        shards.insert(shard_id, Arc::clone(&shard));
        Ok(shard)
    }

    /// The local copy of `shard_id`.
    pub fn shard(&self, shard_id: &ShardId) -> Result<Arc<IndexShard>> {
        self.shards.read().get(shard_id).cloned().ok_or_else(|| {
            SarissaError::shard_unavailable(format!(
                "shard {shard_id} is not allocated on node [{}]",
                self.node_id
            ))
        })
    }

    /// Close and forget the local copy of `shard_id`.
    pub fn remove_shard(&self, shard_id: &ShardId) -> Option<Arc<IndexShard>> {
        let removed = self.shards.write().remove(shard_id);
        if let Some(shard) = &removed {
            shard.close();
        }
        removed
    }

    pub fn shard_ids(&self) -> Vec<ShardId> {
        self.shards.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_shard_lookup() {
        let service = IndicesService::new("node-0", Arc::new(AnalysisRegistry::new().unwrap()));
        let id = ShardId::new("mail", 1);
        service.create_shard(id.clone(), Arc::new(Schema::new())).unwrap();

        assert!(service.shard(&id).is_ok());
        assert!(service.create_shard(id.clone(), Arc::new(Schema::new())).is_err());

        let missing = service.shard(&ShardId::new("mail", 2)).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::ShardUnavailable);
        assert!(missing.is_shard_not_available());

        let removed = service.remove_shard(&id).unwrap();
        assert!(removed.is_closed());
        assert!(service.shard_ids().is_empty());
    }
}
