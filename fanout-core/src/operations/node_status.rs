use crate::{BlobStore, NodeRole, NodeStatusReport, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct NodeStatusOperation {
    node_id: String,
    blob_store: Arc<BlobStore>,
}

impl NodeStatusOperation {
    pub fn new(node_id: String, blob_store: Arc<BlobStore>) -> Self {
        Self {
            node_id,
            blob_store,
        }
    }

    pub async fn run(&self) -> Result<NodeStatusReport> {
        Ok(NodeStatusReport {
            node_id: self.node_id.clone(),
            role: NodeRole::Storage,
            local_item_count: self.blob_store.count_blobs().await?,
        })
    }
}
