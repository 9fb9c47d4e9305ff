use crate::{
    FanoutError, Fingerprint, MetadataStore, NodeClient, NodePool, NodeRole, NodeStatusReport,
    PoolNode, Result, SqliteMetadataStore, StorageKey, StoreReceipt,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeBehavior {
    Up,
    Down,
    Hang,
}

/// In-memory stand-in for a set of storage nodes.
#[derive(Default)]
pub struct FakeNodeClient {
    blobs: Mutex<HashMap<String, HashMap<String, Bytes>>>,
    behaviors: Mutex<HashMap<String, NodeBehavior>>,
    store_calls: AtomicUsize,
    retrieve_order: Mutex<Vec<String>>,
}

impl FakeNodeClient {
    pub fn set_behavior(&self, node_id: &str, behavior: NodeBehavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(node_id.to_string(), behavior);
    }

    pub fn put(&self, node_id: &str, stored_key: &str, body: Bytes) {
        self.blobs
            .lock()
            .unwrap()
            .entry(node_id.to_string())
            .or_default()
            .insert(stored_key.to_string(), body);
    }

    pub fn holds(&self, node_id: &str, stored_key: &str) -> bool {
        self.blobs
            .lock()
            .unwrap()
            .get(node_id)
            .is_some_and(|blobs| blobs.contains_key(stored_key))
    }

    pub fn store_calls(&self) -> usize {
        self.store_calls.load(Ordering::SeqCst)
    }

    pub fn retrieve_order(&self) -> Vec<String> {
        self.retrieve_order.lock().unwrap().clone()
    }

    async fn gate(&self, node: &PoolNode) -> Result<()> {
        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(&node.node_id)
            .copied()
            .unwrap_or(NodeBehavior::Up);

        match behavior {
            NodeBehavior::Up => Ok(()),
            NodeBehavior::Down => Err(FanoutError::NodeUnreachable {
                node_id: node.node_id.clone(),
                reason: "connection refused".to_string(),
            }),
            NodeBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(FanoutError::NodeUnreachable {
                    node_id: node.node_id.clone(),
                    reason: "hung".to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl NodeClient for FakeNodeClient {
    async fn store_blob(
        &self,
        node: &PoolNode,
        fingerprint: &Fingerprint,
        logical_name: &str,
        body: Bytes,
    ) -> Result<StoreReceipt> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        self.gate(node).await?;

        let key = StorageKey::new(*fingerprint, logical_name)?.to_string();
        let size_bytes = body.len() as u64;
        let reused = self.holds(&node.node_id, &key);
        self.put(&node.node_id, &key, body);

        Ok(StoreReceipt {
            node_id: node.node_id.clone(),
            stored_key: key,
            size_bytes,
            reused,
        })
    }

    async fn retrieve_blob(&self, node: &PoolNode, stored_key: &str) -> Result<Option<Bytes>> {
        self.retrieve_order
            .lock()
            .unwrap()
            .push(node.node_id.clone());
        self.gate(node).await?;

        Ok(self
            .blobs
            .lock()
            .unwrap()
            .get(&node.node_id)
            .and_then(|blobs| blobs.get(stored_key).cloned()))
    }

    async fn node_status(&self, node: &PoolNode) -> Result<NodeStatusReport> {
        self.gate(node).await?;
        let local_item_count = self
            .blobs
            .lock()
            .unwrap()
            .get(&node.node_id)
            .map(|blobs| blobs.len() as u64)
            .unwrap_or(0);

        Ok(NodeStatusReport {
            node_id: node.node_id.clone(),
            role: NodeRole::Storage,
            local_item_count,
        })
    }
}

pub fn pool_of(size: usize) -> NodePool {
    let nodes = (0..size)
        .map(|index| PoolNode {
            node_id: format!("node-{}", index),
            address: format!("127.0.0.1:{}", 9000 + index),
        })
        .collect();
    NodePool::new(nodes).unwrap()
}

pub fn sqlite_store() -> (tempfile::TempDir, Arc<dyn MetadataStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteMetadataStore::open(dir.path().join("meta.sqlite3")).unwrap();
    (dir, Arc::new(store))
}
