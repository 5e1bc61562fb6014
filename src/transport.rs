//! Node-to-node request transport.
//!
//! Every shard-level request and response crosses the binary stream format
//! in [`stream`], even when the target node lives in the same process.

pub mod local;
pub mod stream;

use crate::error::Result;

pub use local::LocalTransport;
pub use stream::{StreamInput, StreamOutput};

/// Handles requests for one action on one node.
pub trait TransportRequestHandler: Send + Sync {
    fn handle(&self, payload: &[u8]) -> Result<Vec<u8>>;
}

/// Sends serialized requests to other nodes.
pub trait Transport: Send + Sync {
    /// Send `payload` to `action` on `node_id` and wait for the serialized response.
    fn send_request(&self, node_id: &str, action: &str, payload: &[u8]) -> Result<Vec<u8>>;
}
