use crate::{BlobStore, FanoutError, Fingerprint, Result, StorageKey, fingerprint};
use bytes::Bytes;
use std::sync::Arc;

#[derive(Clone)]
pub struct InternalStoreBlobOperation {
    node_id: String,
    blob_store: Arc<BlobStore>,
}

#[derive(Debug, Clone)]
pub struct InternalStoreBlobOperationRequest {
    pub fingerprint: String,
    pub logical_name: Option<String>,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct InternalStoreBlobOperationResult {
    pub node_id: String,
    pub stored_key: String,
    pub size_bytes: u64,
    pub reused: bool,
}

impl InternalStoreBlobOperation {
    pub fn new(node_id: String, blob_store: Arc<BlobStore>) -> Self {
        Self {
            node_id,
            blob_store,
        }
    }

    pub async fn run(
        &self,
        request: InternalStoreBlobOperationRequest,
    ) -> Result<InternalStoreBlobOperationResult> {
        let InternalStoreBlobOperationRequest {
            fingerprint: claimed,
            logical_name,
            body,
        } = request;

        let claimed = Fingerprint::from_hex(&claimed)?;
        let logical_name = logical_name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| FanoutError::InvalidRequest("missing logical name".to_string()))?;

        let actual = fingerprint(&body);
        if actual != claimed {
            return Err(FanoutError::InvalidRequest(format!(
                "body fingerprint {} does not match {}",
                actual, claimed
            )));
        }

        let key = StorageKey::new(claimed, &logical_name)?;
        let put = self.blob_store.put_blob(&key, body).await?;

        tracing::debug!(
            "Stored blob: key={} size={} reused={}",
            key,
            put.size_bytes,
            put.reused
        );

        Ok(InternalStoreBlobOperationResult {
            node_id: self.node_id.clone(),
            stored_key: key.to_string(),
            size_bytes: put.size_bytes,
            reused: put.reused,
        })
    }
}
