//! Global and per-index operation blocks.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cluster::state::ClusterState;
use crate::error::SarissaError;

/// The class of operations a block applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterBlockLevel {
    Read,
    Write,
    Metadata,
}

/// A block on some levels of operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterBlock {
    pub id: u32,
    pub description: String,
    pub levels: Vec<ClusterBlockLevel>,
    #[serde(default)]
    pub retryable: bool,
}

impl ClusterBlock {
    pub fn new<S: Into<String>>(id: u32, description: S, levels: &[ClusterBlockLevel]) -> Self {
        ClusterBlock {
            id,
            description: description.into(),
            levels: levels.to_vec(),
            retryable: false,
        }
    }

    /// Blocks reads and writes until the cluster state is recovered.
    pub fn state_not_recovered() -> Self {
        ClusterBlock {
            retryable: true,
            ..ClusterBlock::new(
                1,
                "state not recovered / initialized",
                &[
                    ClusterBlockLevel::Read,
                    ClusterBlockLevel::Write,
                    ClusterBlockLevel::Metadata,
                ],
            )
        }
    }

    /// An index closed for reads and writes.
    pub fn index_closed() -> Self {
        ClusterBlock::new(
            4,
            "index closed",
            &[ClusterBlockLevel::Read, ClusterBlockLevel::Write],
        )
    }

    pub fn applies_to(&self, level: ClusterBlockLevel) -> bool {
        self.levels.contains(&level)
    }
}

impl fmt::Display for ClusterBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}]", self.id, self.description)
    }
}

/// All blocks of a cluster state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterBlocks {
    global: Vec<ClusterBlock>,
    indices: BTreeMap<String, Vec<ClusterBlock>>,
}

impl ClusterBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_global(&mut self, block: ClusterBlock) {
        if !self.global.contains(&block) {
            self.global.push(block);
        }
    }

    pub fn remove_global(&mut self, id: u32) {
        self.global.retain(|block| block.id != id);
    }

    pub fn add_index_block<S: Into<String>>(&mut self, index: S, block: ClusterBlock) {
        let blocks = self.indices.entry(index.into()).or_default();
        if !blocks.contains(&block) {
            blocks.push(block);
        }
    }

    pub fn remove_index_block(&mut self, index: &str, id: u32) {
        if let Some(blocks) = self.indices.get_mut(index) {
            blocks.retain(|block| block.id != id);
            if blocks.is_empty() {
                self.indices.remove(index);
            }
        }
    }

    pub fn global(&self, level: ClusterBlockLevel) -> Vec<&ClusterBlock> {
        self.global.iter().filter(|b| b.applies_to(level)).collect()
    }

    pub fn index(&self, index: &str, level: ClusterBlockLevel) -> Vec<&ClusterBlock> {
        self.indices
            .get(index)
            .map(|blocks| blocks.iter().filter(|b| b.applies_to(level)).collect())
            .unwrap_or_default()
    }

    /// The error raised when a global block covers `level`.
    pub fn global_blocked_error(&self, level: ClusterBlockLevel) -> Option<SarissaError> {
        blocked_error(&self.global(level))
    }

    /// The error raised when any of `indices` is blocked at `level`.
    pub fn indices_blocked_error(
        &self,
        level: ClusterBlockLevel,
        indices: &[String],
    ) -> Option<SarissaError> {
        let blocks: Vec<&ClusterBlock> = indices
            .iter()
            .flat_map(|index| self.index(index, level))
            .collect();
        blocked_error(&blocks)
    }
}

fn blocked_error(blocks: &[&ClusterBlock]) -> Option<SarissaError> {
    if blocks.is_empty() {
        return None;
    }
    let described: Vec<String> = blocks.iter().map(|b| b.to_string()).collect();
    Some(SarissaError::cluster_blocked(format!(
        "blocked by: {};",
        described.join(", ")
    )))
}

/// Read-block checks consulted before a read operation is dispatched.
pub trait ClusterBlockService: Send + Sync {
    fn global_read_block(&self, state: &ClusterState) -> Option<SarissaError>;

    fn indices_read_block(&self, state: &ClusterState, indices: &[String]) -> Option<SarissaError>;
}

/// Checks the blocks recorded in the cluster state.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateBlockService;

impl ClusterBlockService for StateBlockService {
    fn global_read_block(&self, state: &ClusterState) -> Option<SarissaError> {
        state.blocks.global_blocked_error(ClusterBlockLevel::Read)
    }

    fn indices_read_block(&self, state: &ClusterState, indices: &[String]) -> Option<SarissaError> {
        state
            .blocks
            .indices_blocked_error(ClusterBlockLevel::Read, indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_global_block_levels() {
        let mut blocks = ClusterBlocks::new();
        assert!(blocks.global_blocked_error(ClusterBlockLevel::Read).is_none());

        blocks.add_global(ClusterBlock::new(
            7,
            "read only",
            &[ClusterBlockLevel::Write],
        ));
        assert!(blocks.global_blocked_error(ClusterBlockLevel::Read).is_none());

        blocks.add_global(ClusterBlock::state_not_recovered());
        let err = blocks.global_blocked_error(ClusterBlockLevel::Read).unwrap();
        assert_eq!(err.kind(), ErrorKind::ClusterBlocked);
        assert!(err.to_string().contains("[1/state not recovered / initialized]"));

        blocks.remove_global(1);
        assert!(blocks.global_blocked_error(ClusterBlockLevel::Read).is_none());
    }

    #[test]
    fn test_index_blocks() {
        let mut blocks = ClusterBlocks::new();
        blocks.add_index_block("mail", ClusterBlock::index_closed());

        let indices = vec!["news".to_string(), "mail".to_string()];
        let err = blocks
            .indices_blocked_error(ClusterBlockLevel::Read, &indices)
            .unwrap();
        assert_eq!(err.to_string(), "Cluster blocked: blocked by: [4/index closed];");
        assert!(
            blocks
                .indices_blocked_error(ClusterBlockLevel::Metadata, &indices)
                .is_none()
        );

        blocks.remove_index_block("mail", 4);
        assert!(blocks.index("mail", ClusterBlockLevel::Read).is_empty());
    }
}
