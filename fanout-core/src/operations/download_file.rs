use crate::{
    Coordinator, FanoutError, FileRecord, MetadataStore, NodeClient, NodePool, Result, StorageKey,
    verify_hash,
};
use bytes::Bytes;
use std::sync::Arc;

#[derive(Clone)]
pub struct DownloadFileOperation {
    pool: Arc<NodePool>,
    coordinator: Arc<Coordinator>,
    node_client: Arc<dyn NodeClient>,
    metadata: Arc<dyn MetadataStore>,
}

#[derive(Debug, Clone)]
pub struct DownloadFileOperationRequest {
    pub file_id: i64,
}

#[derive(Debug, Clone)]
pub struct DownloadFileOperationResult {
    pub record: FileRecord,
    pub body: Bytes,
    pub served_by: String,
}

#[derive(Debug, Clone)]
pub enum DownloadFileOperationOutcome {
    Found(DownloadFileOperationResult),
    NotFound,
}

impl DownloadFileOperation {
    pub fn new(
        pool: Arc<NodePool>,
        coordinator: Arc<Coordinator>,
        node_client: Arc<dyn NodeClient>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            pool,
            coordinator,
            node_client,
            metadata,
        }
    }

    pub async fn run(
        &self,
        request: DownloadFileOperationRequest,
    ) -> Result<DownloadFileOperationOutcome> {
        let Some(record) = self.metadata.get_by_id(request.file_id).await? else {
            return Ok(DownloadFileOperationOutcome::NotFound);
        };

        let (body, served_by) = self.retrieve(&record).await?;

        Ok(DownloadFileOperationOutcome::Found(
            DownloadFileOperationResult {
                record,
                body,
                served_by,
            },
        ))
    }

    /// Walks the recorded candidates in order and returns the first usable copy
    /// together with the id of the node that served it.
    pub async fn retrieve(&self, record: &FileRecord) -> Result<(Bytes, String)> {
        let stored_key = StorageKey::new(record.fingerprint, &record.logical_name)?.to_string();
        let timeout = self.coordinator.request_timeout();
        let mut attempted = 0usize;

        for node_id in &record.candidate_nodes {
            attempted += 1;

            let Some(node) = self.pool.get(node_id) else {
                tracing::warn!(
                    "Candidate {} for file {} is no longer in the node pool",
                    node_id,
                    record.id
                );
                continue;
            };

            let retrieve = self.node_client.retrieve_blob(node, &stored_key);
            let fetched = match tokio::time::timeout(timeout, retrieve).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        "Replica read timed out: node={} key={} timeout={:?}",
                        node_id,
                        stored_key,
                        timeout
                    );
                    continue;
                }
            };

            let body = match fetched {
                Ok(Some(body)) => body,
                Ok(None) => {
                    tracing::debug!("Replica missing: node={} key={}", node_id, stored_key);
                    continue;
                }
                Err(error) => {
                    tracing::warn!(
                        "Replica read failed: node={} key={} error={}",
                        node_id,
                        stored_key,
                        error
                    );
                    continue;
                }
            };

            if self.coordinator.verify_integrity() {
                if let Err(error) = verify_hash(&body, &record.fingerprint) {
                    tracing::warn!(
                        "Replica rejected: node={} key={} error={}",
                        node_id,
                        stored_key,
                        error
                    );
                    continue;
                }
            }

            return Ok((body, node_id.clone()));
        }

        Err(FanoutError::BlobUnavailable {
            fingerprint: record.fingerprint.to_hex(),
            attempted,
        })
    }
}
