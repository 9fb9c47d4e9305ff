use crate::{BlobStore, Fingerprint, Result, StorageKey};
use bytes::Bytes;
use std::sync::Arc;

#[derive(Clone)]
pub struct InternalRetrieveBlobOperation {
    blob_store: Arc<BlobStore>,
}

#[derive(Debug, Clone)]
pub struct InternalRetrieveBlobOperationRequest {
    pub stored_key: String,
}

#[derive(Debug, Clone)]
pub struct InternalBlobPayload {
    pub bytes: Bytes,
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Clone)]
pub enum InternalRetrieveBlobOperationOutcome {
    Found(InternalBlobPayload),
    NotFound,
}

impl InternalRetrieveBlobOperation {
    pub fn new(blob_store: Arc<BlobStore>) -> Self {
        Self { blob_store }
    }

    pub async fn run(
        &self,
        request: InternalRetrieveBlobOperationRequest,
    ) -> Result<InternalRetrieveBlobOperationOutcome> {
        let key = StorageKey::parse(&request.stored_key)?;

        match self.blob_store.get_blob(&key).await? {
            Some(bytes) => Ok(InternalRetrieveBlobOperationOutcome::Found(
                InternalBlobPayload {
                    bytes,
                    fingerprint: key.fingerprint,
                },
            )),
            None => Ok(InternalRetrieveBlobOperationOutcome::NotFound),
        }
    }
}
