use super::{
    GatewayHealthResponse, GatewayState, ListFilesResponse, NameQuery, NodeItem, NodesResponse,
    response_error,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use fanout_core::{
    DownloadFileOperationOutcome, DownloadFileOperationRequest, FanoutError,
    GetFileOperationOutcome, GetFileOperationRequest, NodeStatusReport, PoolNode,
    UploadFileOperationRequest,
};
use std::sync::Arc;
use tokio::task::JoinSet;

pub(crate) const UPLOADER_HEADER: &str = "x-fanout-uploader";
const DEFAULT_UPLOADER: &str = "anonymous";

pub(crate) async fn gateway_health(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    match state.metadata.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(GatewayHealthResponse {
                status: "healthy".to_string(),
                database: Some("connected".to_string()),
                error: None,
            }),
        ),
        Err(error) => {
            tracing::warn!("Metadata store health check failed: {}", error);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(GatewayHealthResponse {
                    status: "unhealthy".to_string(),
                    database: None,
                    error: Some(error.to_string()),
                }),
            )
        }
    }
}

pub(crate) async fn v1_upload_file(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<NameQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let Some(logical_name) = query.name.filter(|name| !name.is_empty()) else {
        return response_error(StatusCode::BAD_REQUEST, "no file selected");
    };

    let uploader = headers
        .get(UPLOADER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_UPLOADER)
        .to_string();

    let result = state
        .upload_file_operation
        .run(UploadFileOperationRequest {
            logical_name,
            uploader,
            body,
        })
        .await;

    match result {
        Ok(result) => (StatusCode::CREATED, Json(result.record)).into_response(),
        Err(FanoutError::InvalidRequest(message)) => {
            response_error(StatusCode::BAD_REQUEST, message)
        }
        Err(error @ FanoutError::QuorumNotMet { .. }) => {
            response_error(StatusCode::SERVICE_UNAVAILABLE, error.to_string())
        }
        Err(error) => {
            tracing::error!("Upload on gateway {} failed: {}", state.node_id, error);
            response_error(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
        }
    }
}

pub(crate) async fn v1_list_files(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    match state.list_files_operation.run().await {
        Ok(result) => (
            StatusCode::OK,
            Json(ListFilesResponse {
                items: result.items,
            }),
        )
            .into_response(),
        Err(error) => response_error(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

pub(crate) async fn v1_get_file(
    State(state): State<Arc<GatewayState>>,
    Path(file_id): Path<i64>,
) -> impl IntoResponse {
    match state
        .get_file_operation
        .run(GetFileOperationRequest { file_id })
        .await
    {
        Ok(GetFileOperationOutcome::Found(record)) => {
            (StatusCode::OK, Json(record)).into_response()
        }
        Ok(GetFileOperationOutcome::NotFound) => {
            response_error(StatusCode::NOT_FOUND, "file not found")
        }
        Err(error) => response_error(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

pub(crate) async fn v1_get_file_content(
    State(state): State<Arc<GatewayState>>,
    Path(file_id): Path<i64>,
) -> impl IntoResponse {
    let result = state
        .download_file_operation
        .run(DownloadFileOperationRequest { file_id })
        .await;

    match result {
        Ok(DownloadFileOperationOutcome::Found(found)) => {
            tracing::debug!(
                "Serving file {} from {}",
                found.record.id,
                found.served_by
            );

            let mut response = Response::new(found.body.into());
            *response.status_mut() = StatusCode::OK;
            let headers = response.headers_mut();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            );
            let disposition = content_disposition(&found.record.logical_name);
            if let Ok(value) = HeaderValue::from_str(&disposition) {
                headers.insert(header::CONTENT_DISPOSITION, value);
            }
            if let Ok(value) = HeaderValue::from_str(&found.record.fingerprint.to_hex()) {
                headers.insert(header::ETAG, value);
            }
            response
        }
        Ok(DownloadFileOperationOutcome::NotFound) => {
            response_error(StatusCode::NOT_FOUND, "file not found")
        }
        Err(error @ FanoutError::BlobUnavailable { .. }) => {
            tracing::warn!("File {} unavailable: {}", file_id, error);
            response_error(StatusCode::SERVICE_UNAVAILABLE, error.to_string())
        }
        Err(error) => response_error(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

pub(crate) async fn v1_nodes(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let timeout = state.coordinator.request_timeout();
    let mut tasks = JoinSet::new();

    for (index, node) in state.pool.nodes().iter().cloned().enumerate() {
        let client = state.node_client.clone();
        tasks.spawn(async move {
            let status = tokio::time::timeout(timeout, client.node_status(&node))
                .await
                .unwrap_or_else(|_| {
                    Err(FanoutError::NodeUnreachable {
                        node_id: node.node_id.clone(),
                        reason: format!("status timed out after {:?}", timeout),
                    })
                });
            (index, node_item(&node, status))
        });
    }

    let mut nodes = Vec::with_capacity(state.pool.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(item) => nodes.push(item),
            Err(error) => tracing::warn!("Node status task aborted: {}", error),
        }
    }
    nodes.sort_by_key(|(index, _)| *index);
    let nodes = nodes.into_iter().map(|(_, item)| item).collect();

    (StatusCode::OK, Json(NodesResponse { nodes })).into_response()
}

fn node_item(node: &PoolNode, status: fanout_core::Result<NodeStatusReport>) -> NodeItem {
    match status {
        Ok(report) => NodeItem {
            node_id: node.node_id.clone(),
            address: node.address.clone(),
            reachable: true,
            role: Some(report.role),
            local_item_count: Some(report.local_item_count),
            error: None,
        },
        Err(error) => NodeItem {
            node_id: node.node_id.clone(),
            address: node.address.clone(),
            reachable: false,
            role: None,
            local_item_count: None,
            error: Some(error.to_string()),
        },
    }
}

/// `filename` carries an ASCII fallback; `filename*` carries the exact name
/// as RFC 5987 UTF-8.
fn content_disposition(logical_name: &str) -> String {
    let fallback: String = logical_name
        .chars()
        .map(|ch| {
            if ch.is_ascii() && !ch.is_ascii_control() && ch != '"' && ch != '\\' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(logical_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("q3.csv"),
            "attachment; filename=\"q3.csv\"; filename*=UTF-8''q3.csv"
        );
    }

    #[test]
    fn test_content_disposition_utf8_and_quotes() {
        assert_eq!(
            content_disposition("报告 \"v2\".pdf"),
            "attachment; filename=\"__ _v2_.pdf\"; \
             filename*=UTF-8''%E6%8A%A5%E5%91%8A%20%22v2%22.pdf"
        );
        assert!(HeaderValue::from_str(&content_disposition("报告.pdf")).is_ok());
    }
}
