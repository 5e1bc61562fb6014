//! Shard routing table and the resolution of read requests to shard copies.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use crate::cluster::state::ClusterState;
use crate::error::{Result, SarissaError};
use crate::index::shard::ShardId;

/// Allocation state of a shard copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardRoutingState {
    Unassigned,
    Initializing,
    Started,
}

/// One copy of a shard and where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardRouting {
    pub shard_id: ShardId,
    pub node_id: Option<String>,
    pub primary: bool,
    pub state: ShardRoutingState,
}

impl ShardRouting {
    /// A started copy on `node_id`.
    pub fn started<S: Into<String>>(shard_id: ShardId, node_id: S, primary: bool) -> Self {
        ShardRouting {
            shard_id,
            node_id: Some(node_id.into()),
            primary,
            state: ShardRoutingState::Started,
        }
    }

    /// Only started, assigned copies serve reads.
    pub fn is_active(&self) -> bool {
        self.state == ShardRoutingState::Started && self.node_id.is_some()
    }

    pub fn current_node_id(&self) -> Option<&str> {
        self.node_id.as_deref()
    }
}

impl fmt::Display for ShardRouting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, node[{}], [{}], s[{:?}]",
            self.shard_id,
            self.node_id.as_deref().unwrap_or("null"),
            if self.primary { "P" } else { "R" },
            self.state
        )
    }
}

/// All copies of one shard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexShardRoutingTable {
    pub shard_id: ShardId,
    pub copies: Vec<ShardRouting>,
}

impl IndexShardRoutingTable {
    pub fn active_shards(&self) -> Vec<ShardRouting> {
        self.copies.iter().filter(|c| c.is_active()).cloned().collect()
    }

    pub fn primary(&self) -> Option<&ShardRouting> {
        self.copies.iter().find(|c| c.primary)
    }
}

/// Routing of every shard of every index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingTable {
    indices: BTreeMap<String, Vec<IndexShardRoutingTable>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `copy` in its shard group, replacing a copy on the same node.
    pub fn add_copy(&mut self, copy: ShardRouting) {
        let groups = self.indices.entry(copy.shard_id.index.clone()).or_default();
        let position = groups.iter().position(|g| g.shard_id == copy.shard_id);
        let group = match position {
            Some(i) => &mut groups[i],
            None => {
                groups.push(IndexShardRoutingTable {
                    shard_id: copy.shard_id.clone(),
                    copies: Vec::new(),
                });
                groups.sort_by_key(|g| g.shard_id.id);
                let i = groups
                    .iter()
                    .position(|g| g.shard_id == copy.shard_id)
                    .unwrap_or_default();
                &mut groups[i]
            }
        };
        group.copies.retain(|c| c.node_id.is_none() || c.node_id != copy.node_id);
        group.copies.push(copy);
        group.copies.sort_by_key(|c| !c.primary);
    }

    /// Change the state of the copy of `shard_id` held by `node_id`.
    pub fn set_state(&mut self, shard_id: &ShardId, node_id: &str, state: ShardRoutingState) -> bool {
        let Some(group) = self
            .indices
            .get_mut(&shard_id.index)
            .and_then(|groups| groups.iter_mut().find(|g| &g.shard_id == shard_id))
        else {
            return false;
        };
        match group
            .copies
            .iter_mut()
            .find(|c| c.node_id.as_deref() == Some(node_id))
        {
            Some(copy) => {
                copy.state = state;
                true
            }
            None => false,
        }
    }

    pub fn index(&self, index: &str) -> Option<&[IndexShardRoutingTable]> {
        self.indices.get(index).map(Vec::as_slice)
    }

    pub fn shard(&self, shard_id: &ShardId) -> Option<&IndexShardRoutingTable> {
        self.index(&shard_id.index)?
            .iter()
            .find(|g| &g.shard_id == shard_id)
    }

    /// Every copy allocated on `node_id`.
    pub fn copies_on_node(&self, node_id: &str) -> Vec<&ShardRouting> {
        self.indices
            .values()
            .flatten()
            .flat_map(|group| group.copies.iter())
            .filter(|c| c.node_id.as_deref() == Some(node_id))
            .collect()
    }
}

/// The copies of one shard group in the order they should be tried.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardIterator {
    shard_id: ShardId,
    copies: Vec<ShardRouting>,
    position: usize,
}

impl ShardIterator {
    pub fn new(shard_id: ShardId, copies: Vec<ShardRouting>) -> Self {
        ShardIterator {
            shard_id,
            copies,
            position: 0,
        }
    }

    pub fn shard_id(&self) -> &ShardId {
        &self.shard_id
    }

    /// The first copy to try, without advancing.
    pub fn first(&self) -> Option<&ShardRouting> {
        self.copies.first()
    }

    /// The next untried copy.
    pub fn next_or_none(&mut self) -> Option<&ShardRouting> {
        let copy = self.copies.get(self.position)?;
        self.position += 1;
        Some(copy)
    }

    pub fn size(&self) -> usize {
        self.copies.len()
    }

    pub fn remaining(&self) -> usize {
        self.copies.len() - self.position
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }
}

/// One [`ShardIterator`] per targeted shard group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupShardsIterator {
    iterators: Vec<ShardIterator>,
}

impl GroupShardsIterator {
    pub fn new(iterators: Vec<ShardIterator>) -> Self {
        GroupShardsIterator { iterators }
    }

    /// Number of shard groups.
    pub fn len(&self) -> usize {
        self.iterators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iterators.is_empty()
    }

    /// Total number of copies across all groups.
    pub fn total_size(&self) -> usize {
        self.iterators.iter().map(ShardIterator::size).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ShardIterator> {
        self.iterators.iter()
    }
}

impl IntoIterator for GroupShardsIterator {
    type Item = ShardIterator;
    type IntoIter = std::vec::IntoIter<ShardIterator>;

    fn into_iter(self) -> Self::IntoIter {
        self.iterators.into_iter()
    }
}

/// Resolves a read request to the shard groups it must visit.
pub trait RoutingResolver: Send + Sync {
    fn resolve_shards(
        &self,
        state: &ClusterState,
        indices: &[String],
        routing: &[String],
    ) -> Result<GroupShardsIterator>;
}

/// Hash-based routing with round-robin selection of the first copy.
#[derive(Debug, Default)]
pub struct OperationRouting {
    counter: AtomicUsize,
}

impl OperationRouting {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shard a routing key (or document id) maps to.
    pub fn shard_id_for(routing: &str, number_of_shards: u32) -> u32 {
        crc32fast::hash(routing.as_bytes()) % number_of_shards.max(1)
    }
}

impl RoutingResolver for OperationRouting {
    fn resolve_shards(
        &self,
        state: &ClusterState,
        indices: &[String],
        routing: &[String],
    ) -> Result<GroupShardsIterator> {
        let mut iterators = Vec::new();
        for index in indices {
            let metadata = state
                .metadata(index)
                .ok_or_else(|| SarissaError::index_not_found(index.clone()))?;
            let groups = state.routing_table.index(index).unwrap_or_default();

            let wanted: Option<BTreeSet<u32>> = (!routing.is_empty()).then(|| {
                routing
                    .iter()
                    .map(|key| Self::shard_id_for(key, metadata.number_of_shards()))
                    .collect()
            });

            for group in groups {
                if let Some(wanted) = &wanted {
                    if !wanted.contains(&group.shard_id.id) {
                        continue;
                    }
                }
                let mut copies = group.active_shards();
                if !copies.is_empty() {
                    let offset = self.counter.fetch_add(1, Ordering::Relaxed) % copies.len();
                    copies.rotate_left(offset);
                }
                iterators.push(ShardIterator::new(group.shard_id.clone(), copies));
            }
        }
        Ok(GroupShardsIterator::new(iterators))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::state::IndexMetadata;
    use crate::schema::{IndexSettings, Schema};
    use std::sync::Arc;

    fn state(shards: u32) -> ClusterState {
        let mut state = ClusterState::new();
        let settings = IndexSettings {
            number_of_shards: shards,
            number_of_replicas: 1,
            analyzer: None,
        };
        state.put_index(IndexMetadata::new("mail", settings, Arc::new(Schema::new())));
        for id in 0..shards {
            let shard_id = ShardId::new("mail", id);
            state
                .routing_table
                .add_copy(ShardRouting::started(shard_id.clone(), "n0", true));
            state
                .routing_table
                .add_copy(ShardRouting::started(shard_id, "n1", false));
        }
        state
    }

    #[test]
    fn test_one_iterator_per_group() {
        let routing = OperationRouting::new();
        let groups = routing
            .resolve_shards(&state(3), &["mail".to_string()], &[])
            .unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups.total_size(), 6);
        let ids: Vec<u32> = groups.iter().map(|it| it.shard_id().id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_routing_keys_select_shards() {
        let routing = OperationRouting::new();
        let key = "user-17".to_string();
        let expected = OperationRouting::shard_id_for(&key, 4);
        let groups = routing
            .resolve_shards(&state(4), &["mail".to_string()], &[key.clone(), key])
            .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.iter().next().unwrap().shard_id().id, expected);
    }

    #[test]
    fn test_round_robin_and_inactive_copies() {
        let routing = OperationRouting::new();
        let mut state = state(1);
        let indices = ["mail".to_string()];

        let first = |routing: &OperationRouting, state: &ClusterState| {
            let groups = routing.resolve_shards(state, &indices, &[]).unwrap();
            groups.iter().next().unwrap().first().cloned()
        };
        let a = first(&routing, &state).unwrap();
        let b = first(&routing, &state).unwrap();
        assert_ne!(a.node_id, b.node_id);

        let shard_id = ShardId::new("mail", 0);
        state
            .routing_table
            .set_state(&shard_id, "n0", ShardRoutingState::Initializing);
        state
            .routing_table
            .set_state(&shard_id, "n1", ShardRoutingState::Unassigned);
        let mut groups = routing.resolve_shards(&state, &indices, &[]).unwrap().into_iter();
        let mut group = groups.next().unwrap();
        assert_eq!(group.size(), 0);
        assert!(group.next_or_none().is_none());
    }

    #[test]
    fn test_unknown_index() {
        let routing = OperationRouting::new();
        let err = routing
            .resolve_shards(&state(1), &["nope".to_string()], &[])
            .unwrap_err();
        assert!(err.is_shard_not_available());
    }
}
