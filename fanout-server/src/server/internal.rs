use super::{
    NameQuery, StorageHealthResponse, StorageState, StoreBlobErrorResponse, StoreBlobResponse,
    response_error,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use fanout_core::{
    FINGERPRINT_HEADER, FanoutError, InternalRetrieveBlobOperationOutcome,
    InternalRetrieveBlobOperationRequest, InternalStoreBlobOperationRequest, NodeRole,
};
use std::sync::Arc;

pub(crate) async fn storage_health(State(state): State<Arc<StorageState>>) -> impl IntoResponse {
    Json(StorageHealthResponse {
        status: "ok".to_string(),
        node_id: state.node_id.clone(),
        role: NodeRole::Storage,
    })
}

pub(crate) async fn internal_status(State(state): State<Arc<StorageState>>) -> impl IntoResponse {
    match state.node_status_operation.run().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => response_error(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

pub(crate) async fn internal_put_blob(
    State(state): State<Arc<StorageState>>,
    Path(fingerprint): Path<String>,
    Query(query): Query<NameQuery>,
    body: Bytes,
) -> impl IntoResponse {
    let result = state
        .internal_store_blob_operation
        .run(InternalStoreBlobOperationRequest {
            fingerprint,
            logical_name: query.name,
            body,
        })
        .await;

    match result {
        Ok(result) => (
            StatusCode::OK,
            Json(StoreBlobResponse {
                status: "ok".to_string(),
                node_id: result.node_id,
                stored_key: result.stored_key,
                size_bytes: result.size_bytes,
                reused: result.reused,
            }),
        )
            .into_response(),
        Err(FanoutError::InvalidRequest(message)) => store_error(StatusCode::BAD_REQUEST, message),
        Err(error) => {
            tracing::error!("Local blob write failed on {}: {}", state.node_id, error);
            store_error(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
        }
    }
}

pub(crate) async fn internal_get_blob(
    State(state): State<Arc<StorageState>>,
    Path(stored_key): Path<String>,
) -> impl IntoResponse {
    let result = state
        .internal_retrieve_blob_operation
        .run(InternalRetrieveBlobOperationRequest { stored_key })
        .await;

    match result {
        Ok(InternalRetrieveBlobOperationOutcome::Found(blob)) => {
            let mut response = Response::new(blob.bytes.into());
            *response.status_mut() = StatusCode::OK;
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            );
            if let Ok(value) = HeaderValue::from_str(&blob.fingerprint.to_hex()) {
                response.headers_mut().insert(FINGERPRINT_HEADER, value);
            }
            response
        }
        Ok(InternalRetrieveBlobOperationOutcome::NotFound) => {
            response_error(StatusCode::NOT_FOUND, "blob not found")
        }
        Err(FanoutError::InvalidRequest(message)) => {
            response_error(StatusCode::BAD_REQUEST, message)
        }
        Err(error) => response_error(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

fn store_error(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(StoreBlobErrorResponse {
            status: "error".to_string(),
            error: message,
        }),
    )
        .into_response()
}
