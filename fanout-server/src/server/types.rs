use fanout_core::{FileRecord, NodeRole};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct StorageHealthResponse {
    pub(crate) status: String,
    pub(crate) node_id: String,
    pub(crate) role: NodeRole,
}

#[derive(Debug, Serialize)]
pub(crate) struct GatewayHealthResponse {
    pub(crate) status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NameQuery {
    #[serde(default)]
    pub(crate) name: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StoreBlobResponse {
    pub(crate) status: String,
    pub(crate) node_id: String,
    pub(crate) stored_key: String,
    pub(crate) size_bytes: u64,
    pub(crate) reused: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct StoreBlobErrorResponse {
    pub(crate) status: String,
    pub(crate) error: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ListFilesResponse {
    pub(crate) items: Vec<FileRecord>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NodesResponse {
    pub(crate) nodes: Vec<NodeItem>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NodeItem {
    pub(crate) node_id: String,
    pub(crate) address: String,
    pub(crate) reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) role: Option<NodeRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) local_item_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}
