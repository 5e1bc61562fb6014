//! Shard-level classify messages and the node-side handler that serves them.

use std::sync::Arc;

use log::trace;

use crate::action::request::ClassifyRequest;
use crate::classification::{ClassifyResult, ShardClassificationService};
use crate::error::Result;
use crate::index::ShardId;
use crate::indices::IndicesService;
use crate::transport::{StreamInput, StreamOutput, TransportRequestHandler};

/// Transport action name of the shard-level classify request.
pub const SHARD_ACTION_NAME: &str = "indices:data/read/classify[s]";

/// The shard copy a shard-level message is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardTarget {
    pub shard_id: ShardId,
    pub node_id: String,
}

impl ShardTarget {
    pub fn new<S: Into<String>>(shard_id: ShardId, node_id: S) -> Self {
        ShardTarget {
            shard_id,
            node_id: node_id.into(),
        }
    }

    pub fn write_to(&self, out: &mut StreamOutput) {
        out.write_string(&self.shard_id.index);
        out.write_vint(self.shard_id.id);
        out.write_string(&self.node_id);
    }

    pub fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        let index = input.read_string()?;
        let id = input.read_vint()?;
        let node_id = input.read_string()?;
        Ok(ShardTarget::new(ShardId::new(index, id), node_id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShardClassifyRequest {
    pub target: ShardTarget,
    pub request: ClassifyRequest,
}

impl ShardClassifyRequest {
    pub fn new(target: ShardTarget, request: ClassifyRequest) -> Self {
        ShardClassifyRequest { target, request }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = StreamOutput::new();
        self.target.write_to(&mut out);
        self.request.write_to(&mut out);
        out.into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut input = StreamInput::new(bytes);
        let target = ShardTarget::read_from(&mut input)?;
        let request = ClassifyRequest::read_from(&mut input)?;
        Ok(ShardClassifyRequest { target, request })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShardClassifyResponse {
    pub target: ShardTarget,
    pub result: ClassifyResult,
}

impl ShardClassifyResponse {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = StreamOutput::new();
        self.target.write_to(&mut out);
        self.result.write_to(&mut out);
        out.into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut input = StreamInput::new(bytes);
        let target = ShardTarget::read_from(&mut input)?;
        let result = ClassifyResult::read_from(&mut input)?;
        Ok(ShardClassifyResponse { target, result })
    }
}

/// Serves shard-level classify requests from the shards of one node.
#[derive(Debug)]
pub struct ShardClassifyHandler {
    indices: Arc<IndicesService>,
    service: ShardClassificationService,
}

impl ShardClassifyHandler {
    pub fn new(indices: Arc<IndicesService>) -> Self {
        ShardClassifyHandler {
            indices,
            service: ShardClassificationService::new(),
        }
    }

    pub fn execute(&self, request: &ShardClassifyRequest) -> Result<ShardClassifyResponse> {
        let shard = self.indices.shard(&request.target.shard_id)?;
        trace!(
            "[{}] classifying on {}",
            self.indices.node_id(),
            request.target.shard_id
        );
        let result = self.service.evaluate(&shard, &request.request)?;
        Ok(ShardClassifyResponse {
            target: request.target.clone(),
            result,
        })
    }
}

impl TransportRequestHandler for ShardClassifyHandler {
    fn handle(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let request = ShardClassifyRequest::from_bytes(payload)?;
        Ok(self.execute(&request)?.to_bytes())
    }
}
