use crate::error::{FanoutError, Result};
use crate::placement::DEFAULT_REPLICATION_FACTOR;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolNode {
    pub node_id: String,
    pub address: String,
}

/// Ordered, static set of storage nodes known to the gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodePool {
    nodes: Vec<PoolNode>,
}

impl NodePool {
    pub fn new(nodes: Vec<PoolNode>) -> Result<Self> {
        let mut seen = HashSet::new();
        for node in &nodes {
            if node.node_id.trim().is_empty() {
                return Err(FanoutError::Config("pool node_id cannot be empty".to_string()));
            }
            if node.address.trim().is_empty() {
                return Err(FanoutError::Config(format!(
                    "pool node '{}' has empty address",
                    node.node_id
                )));
            }
            if !seen.insert(node.node_id.as_str()) {
                return Err(FanoutError::Config(format!(
                    "duplicate pool node_id: {}",
                    node.node_id
                )));
            }
        }

        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[PoolNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, node_id: &str) -> Option<&PoolNode> {
        self.nodes.iter().find(|node| node.node_id == node_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationSettings {
    pub replication_factor: usize,
    pub write_quorum: usize,
    pub request_timeout: Duration,
    pub verify_integrity: bool,
}

impl Default for ReplicationSettings {
    fn default() -> Self {
        Self {
            replication_factor: DEFAULT_REPLICATION_FACTOR,
            write_quorum: 2,
            request_timeout: Duration::from_secs(5),
            verify_integrity: true,
        }
    }
}

#[derive(Clone)]
pub struct Coordinator {
    settings: ReplicationSettings,
}

impl Coordinator {
    pub fn new(settings: ReplicationSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ReplicationSettings {
        &self.settings
    }

    pub fn replication_factor(&self) -> usize {
        self.settings.replication_factor
    }

    pub fn request_timeout(&self) -> Duration {
        self.settings.request_timeout
    }

    pub fn verify_integrity(&self) -> bool {
        self.settings.verify_integrity
    }

    pub fn write_quorum(&self, replica_count: usize) -> usize {
        self.settings.write_quorum.min(replica_count).max(1)
    }
}
