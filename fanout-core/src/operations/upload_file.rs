use crate::{
    Coordinator, FanoutError, FileRecord, MetadataStore, NewFileRecord, NodeClient, NodePool,
    Result, fingerprint, select_candidates, validate_logical_name,
};
use bytes::Bytes;
use std::sync::Arc;
use tokio::task::JoinSet;

#[derive(Clone)]
pub struct UploadFileOperation {
    pool: Arc<NodePool>,
    coordinator: Arc<Coordinator>,
    node_client: Arc<dyn NodeClient>,
    metadata: Arc<dyn MetadataStore>,
}

#[derive(Debug, Clone)]
pub struct UploadFileOperationRequest {
    pub logical_name: String,
    pub uploader: String,
    pub body: Bytes,
}

/// Per-upload tally of which candidates acknowledged the write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicationOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UploadFileOperationResult {
    pub record: FileRecord,
    pub replication: ReplicationOutcome,
}

impl UploadFileOperation {
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
        request: UploadFileOperationRequest,
    ) -> Result<UploadFileOperationResult> {
        let UploadFileOperationRequest {
            logical_name,
            uploader,
            body,
        } = request;

        let logical_name = validate_logical_name(&logical_name)?;
        let fingerprint = fingerprint(&body);
        let candidates =
            select_candidates(&fingerprint, &self.pool, self.coordinator.replication_factor());

        let replication = self
            .fan_out(&candidates, &fingerprint, &logical_name, &body)
            .await;

        let quorum = self.coordinator.write_quorum(candidates.len());
        if replication.succeeded.len() < quorum {
            tracing::warn!(
                "Upload rejected: name={} fingerprint={} succeeded={:?} failed={:?} quorum={}",
                logical_name,
                fingerprint,
                replication.succeeded,
                replication.failed,
                quorum
            );
            return Err(FanoutError::QuorumNotMet {
                required: quorum,
                succeeded: replication.succeeded.len(),
            });
        }

        let record_id = self
            .metadata
            .insert(NewFileRecord {
                logical_name: logical_name.clone(),
                fingerprint,
                size_bytes: body.len() as u64,
                candidate_nodes: candidates,
                uploader,
            })
            .await?;

        let record = self.metadata.get_by_id(record_id).await?.ok_or_else(|| {
            FanoutError::Internal(format!("file record {} missing after insert", record_id))
        })?;

        tracing::info!(
            "Upload committed: id={} name={} fingerprint={} replicas={}/{}",
            record.id,
            record.logical_name,
            record.fingerprint,
            replication.succeeded.len(),
            record.candidate_nodes.len()
        );

        Ok(UploadFileOperationResult {
            record,
            replication,
        })
    }

    async fn fan_out(
        &self,
        candidates: &[String],
        fingerprint: &crate::Fingerprint,
        logical_name: &str,
        body: &Bytes,
    ) -> ReplicationOutcome {
        let timeout = self.coordinator.request_timeout();
        let mut outcome = ReplicationOutcome::default();
        let mut tasks = JoinSet::new();

        for node_id in candidates {
            let Some(node) = self.pool.get(node_id).cloned() else {
                tracing::warn!("Candidate {} is not in the node pool", node_id);
                outcome.failed.push(node_id.clone());
                continue;
            };

            let client = self.node_client.clone();
            let fingerprint = *fingerprint;
            let logical_name = logical_name.to_string();
            let body = body.clone();

            tasks.spawn(async move {
                let result = tokio::time::timeout(
                    timeout,
                    client.store_blob(&node, &fingerprint, &logical_name, body),
                )
                .await
                .unwrap_or_else(|_| {
                    Err(FanoutError::NodeUnreachable {
                        node_id: node.node_id.clone(),
                        reason: format!("store timed out after {:?}", timeout),
                    })
                });
                (node.node_id, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((node_id, Ok(receipt))) => {
                    tracing::debug!(
                        "Replica stored: node={} key={} reused={}",
                        node_id,
                        receipt.stored_key,
                        receipt.reused
                    );
                    outcome.succeeded.push(node_id);
                }
                Ok((node_id, Err(error))) => {
                    tracing::warn!(
                        "Replica write failed: node={} fingerprint={} error={}",
                        node_id,
                        fingerprint,
                        error
                    );
                    outcome.failed.push(node_id);
                }
                Err(error) => {
                    tracing::warn!("Replica write task aborted: {}", error);
                }
            }
        }

        // Tasks finish in arbitrary order; report in candidate order.
        let rank = |node_id: &String| {
            candidates
                .iter()
                .position(|candidate| candidate == node_id)
                .unwrap_or(usize::MAX)
        };
        outcome.succeeded.sort_by_key(rank);
        outcome.failed.sort_by_key(rank);

        outcome
    }
}
