use super::types::PoolNode;
use crate::error::{FanoutError, Result};
use crate::fingerprint::Fingerprint;
use crate::node::NodeStatusReport;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, Url, header};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const FINGERPRINT_HEADER: &str = "x-fanout-fingerprint";

/// Acknowledgement returned by a storage node after a local write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreReceipt {
    pub node_id: String,
    pub stored_key: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub reused: bool,
}

/// Transport from a coordinator to storage nodes.
#[async_trait]
pub trait NodeClient: Send + Sync {
    async fn store_blob(
        &self,
        node: &PoolNode,
        fingerprint: &Fingerprint,
        logical_name: &str,
        body: Bytes,
    ) -> Result<StoreReceipt>;

    /// `Ok(None)` when the node answers but does not hold the key.
    async fn retrieve_blob(&self, node: &PoolNode, stored_key: &str) -> Result<Option<Bytes>>;

    async fn node_status(&self, node: &PoolNode) -> Result<NodeStatusReport>;
}

#[derive(Clone)]
pub struct HttpNodeClient {
    client: Client,
}

impl HttpNodeClient {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|error| FanoutError::Http(error.to_string()))?;

        Ok(Self { client })
    }

    fn internal_blob_url(&self, address: &str, segment: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("http://{}/internal/v1/blobs/", address))
            .map_err(|error| FanoutError::Http(error.to_string()))?;

        url.path_segments_mut()
            .map_err(|_| FanoutError::Http(format!("address cannot be a base: {}", address)))?
            .pop_if_empty()
            .push(segment);

        Ok(url)
    }

    fn internal_status_url(&self, address: &str) -> Result<Url> {
        Url::parse(&format!("http://{}/internal/v1/status", address))
            .map_err(|error| FanoutError::Http(error.to_string()))
    }
}

fn unreachable(node: &PoolNode, reason: impl ToString) -> FanoutError {
    FanoutError::NodeUnreachable {
        node_id: node.node_id.clone(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    async fn store_blob(
        &self,
        node: &PoolNode,
        fingerprint: &Fingerprint,
        logical_name: &str,
        body: Bytes,
    ) -> Result<StoreReceipt> {
        let mut url = self.internal_blob_url(&node.address, &fingerprint.to_hex())?;
        url.query_pairs_mut().append_pair("name", logical_name);

        let response = self
            .client
            .put(url)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await
            .map_err(|error| unreachable(node, error))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(FanoutError::Http(format!(
                "replica store failed: node={} status={} body={}",
                node.node_id, status, detail
            )));
        }

        response
            .json::<StoreReceipt>()
            .await
            .map_err(|error| FanoutError::Http(error.to_string()))
    }

    async fn retrieve_blob(&self, node: &PoolNode, stored_key: &str) -> Result<Option<Bytes>> {
        let url = self.internal_blob_url(&node.address, stored_key)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| unreachable(node, error))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(FanoutError::Http(format!(
                "replica retrieve failed: node={} status={} key={}",
                node.node_id,
                response.status(),
                stored_key
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|error| unreachable(node, error))?;

        Ok(Some(bytes))
    }

    async fn node_status(&self, node: &PoolNode) -> Result<NodeStatusReport> {
        let url = self.internal_status_url(&node.address)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| unreachable(node, error))?;

        if !response.status().is_success() {
            return Err(FanoutError::Http(format!(
                "status query failed: node={} status={}",
                node.node_id,
                response.status()
            )));
        }

        response
            .json::<NodeStatusReport>()
            .await
            .map_err(|error| FanoutError::Http(error.to_string()))
    }
}
