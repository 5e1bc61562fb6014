//! Configuration for the classify coordinator.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::action::request::DEFAULT_TOP_N;
use crate::error::{Result, SarissaError};

/// Configuration for [`TransportClassifyAction`](crate::action::TransportClassifyAction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    /// Threads running shard requests.
    /// If None, uses the number of CPU cores.
    pub thread_pool_size: Option<usize>,

    /// Upper bound for a blocking classify call, in milliseconds.
    pub deadline_ms: Option<u64>,

    /// `top_n` given to requests built by the CLI.
    pub default_top_n: usize,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            thread_pool_size: None,
            deadline_ms: None,
            default_top_n: DEFAULT_TOP_N,
        }
    }
}

impl ClassifyConfig {
    pub fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = Some(size);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = Some(deadline.as_millis() as u64);
        self
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    /// Load a JSON configuration file; missing keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&content).map_err(|e| {
            SarissaError::invalid_argument(format!(
                "failed to parse classify config {}: {e}",
                path.as_ref().display()
            ))
        })
    }
}
