use crate::config::Config;
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use fanout_core::{
    BlobStore, Coordinator, DownloadFileOperation, FanoutError, GetFileOperation, HttpNodeClient,
    InternalRetrieveBlobOperation, InternalStoreBlobOperation, ListFilesOperation, MetadataStore,
    NodeClient, NodePool, NodeRole, NodeStatusOperation, Result, SqliteMetadataStore,
    UploadFileOperation,
};
use std::sync::Arc;
use tokio::net::TcpListener;

mod external;
mod internal;
mod types;


use external::{
    gateway_health, v1_get_file, v1_get_file_content, v1_list_files, v1_nodes, v1_upload_file,
};
use internal::{internal_get_blob, internal_put_blob, internal_status, storage_health};
pub(crate) use types::*;

pub struct GatewayState {
    pub(crate) node_id: String,
    pub(crate) pool: Arc<NodePool>,
    pub(crate) coordinator: Arc<Coordinator>,
    pub(crate) node_client: Arc<dyn NodeClient>,
    pub(crate) metadata: Arc<dyn MetadataStore>,
    pub(crate) upload_file_operation: Arc<UploadFileOperation>,
    pub(crate) download_file_operation: Arc<DownloadFileOperation>,
    pub(crate) list_files_operation: Arc<ListFilesOperation>,
    pub(crate) get_file_operation: Arc<GetFileOperation>,
}

impl GatewayState {
    pub fn new(
        node_id: String,
        pool: Arc<NodePool>,
        coordinator: Arc<Coordinator>,
        node_client: Arc<dyn NodeClient>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        let upload_file_operation = Arc::new(UploadFileOperation::new(
            pool.clone(),
            coordinator.clone(),
            node_client.clone(),
            metadata.clone(),
        ));
        let download_file_operation = Arc::new(DownloadFileOperation::new(
            pool.clone(),
            coordinator.clone(),
            node_client.clone(),
            metadata.clone(),
        ));
        let list_files_operation = Arc::new(ListFilesOperation::new(metadata.clone()));
        let get_file_operation = Arc::new(GetFileOperation::new(metadata.clone()));

        Self {
            node_id,
            pool,
            coordinator,
            node_client,
            metadata,
            upload_file_operation,
            download_file_operation,
            list_files_operation,
            get_file_operation,
        }
    }
}

pub struct StorageState {
    pub(crate) node_id: String,
    pub(crate) internal_store_blob_operation: Arc<InternalStoreBlobOperation>,
    pub(crate) internal_retrieve_blob_operation: Arc<InternalRetrieveBlobOperation>,
    pub(crate) node_status_operation: Arc<NodeStatusOperation>,
}

impl StorageState {
    pub fn new(node_id: String, blob_store: Arc<BlobStore>) -> Self {
        Self {
            internal_store_blob_operation: Arc::new(InternalStoreBlobOperation::new(
                node_id.clone(),
                blob_store.clone(),
            )),
            internal_retrieve_blob_operation: Arc::new(InternalRetrieveBlobOperation::new(
                blob_store.clone(),
            )),
            node_status_operation: Arc::new(NodeStatusOperation::new(node_id.clone(), blob_store)),
            node_id,
        }
    }
}

pub fn gateway_router(state: Arc<GatewayState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(gateway_health))
        .route("/api/v1/nodes", get(v1_nodes))
        .route("/api/v1/files", get(v1_list_files).post(v1_upload_file))
        .route("/api/v1/files/:id", get(v1_get_file))
        .route("/api/v1/files/:id/content", get(v1_get_file_content))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

pub fn storage_router(state: Arc<StorageState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(storage_health))
        .route("/internal/v1/status", get(internal_status))
        .route(
            "/internal/v1/blobs/:key",
            get(internal_get_blob).put(internal_put_blob),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

pub async fn run_server(config: Config) -> Result<()> {
    let node_cfg = config.node.clone();

    let app = match node_cfg.role {
        NodeRole::Storage => {
            let blob_store = Arc::new(BlobStore::new(node_cfg.data_dir.clone())?);
            tracing::info!(
                "Storage node {} serving blobs from {}",
                node_cfg.node_id,
                node_cfg.data_dir.display()
            );

            let state = Arc::new(StorageState::new(node_cfg.node_id.clone(), blob_store));
            storage_router(state, node_cfg.max_body_bytes)
        }
        NodeRole::Gateway => {
            let pool = Arc::new(config.node_pool()?);
            let settings = config.replication_settings();
            let node_client: Arc<dyn NodeClient> =
                Arc::new(HttpNodeClient::new(settings.request_timeout)?);
            let coordinator = Arc::new(Coordinator::new(settings));

            let db_path = config.db_path();
            let metadata: Arc<dyn MetadataStore> = Arc::new(
                SqliteMetadataStore::open_with_retry(db_path.clone(), &config.retry_policy())
                    .await?,
            );

            tracing::info!(
                "Gateway {} coordinating {} storage nodes (K={}, quorum={}), metadata at {}",
                node_cfg.node_id,
                pool.len(),
                coordinator.replication_factor(),
                coordinator.settings().write_quorum,
                db_path.display()
            );

            let state = Arc::new(GatewayState::new(
                node_cfg.node_id.clone(),
                pool,
                coordinator,
                node_client,
                metadata,
            ));
            gateway_router(state, node_cfg.max_body_bytes)
        }
    };

    let listener = TcpListener::bind(&node_cfg.bind_addr).await?;
    tracing::info!(
        "Fanout {} node {} listening on {}",
        node_cfg.role,
        node_cfg.node_id,
        node_cfg.bind_addr
    );

    axum::serve(listener, app)
        .await
        .map_err(|error| FanoutError::Http(error.to_string()))?;

    Ok(())
}

pub(crate) fn response_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}
