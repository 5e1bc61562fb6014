//! In-process transport dispatching to per-node handlers.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::trace;
use parking_lot::RwLock;

use crate::error::{Result, SarissaError};
use crate::transport::{Transport, TransportRequestHandler};

/// Routes requests to handlers registered per `(node, action)`.
#[derive(Default)]
pub struct LocalTransport {
    handlers: RwLock<BTreeMap<(String, String), Arc<dyn TransportRequestHandler>>>,
    disconnected: RwLock<BTreeSet<String>>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_handler<N: Into<String>, A: Into<String>>(
        &self,
        node_id: N,
        action: A,
        handler: Arc<dyn TransportRequestHandler>,
    ) {
        self.handlers
            .write()
            .insert((node_id.into(), action.into()), handler);
    }

    /// Make requests to `node_id` fail until [`reconnect`](Self::reconnect).
    pub fn disconnect(&self, node_id: &str) {
        self.disconnected.write().insert(node_id.to_string());
    }

    pub fn reconnect(&self, node_id: &str) {
        self.disconnected.write().remove(node_id);
    }

    pub fn is_connected(&self, node_id: &str) -> bool {
        !self.disconnected.read().contains(node_id)
    }
}

impl Transport for LocalTransport {
    fn send_request(&self, node_id: &str, action: &str, payload: &[u8]) -> Result<Vec<u8>> {
        if !self.is_connected(node_id) {
            return Err(SarissaError::transport(format!(
                "node [{node_id}] is not connected"
            )));
        }
        let handler = self
            .handlers
            .read()
            .get(&(node_id.to_string(), action.to_string()))
            .cloned()
            .ok_or_else(|| {
                SarissaError::transport(format!(
                    "no handler for action [{action}] on node [{node_id}]"
                ))
            })?;
        trace!("sending [{action}] to [{node_id}], {} bytes", payload.len());
        handler.handle(payload)
    }
}

impl std::fmt::Debug for LocalTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTransport")
            .field("handlers", &self.handlers.read().keys().collect::<Vec<_>>())
            .field("disconnected", &*self.disconnected.read())
            .finish()
    }
}
