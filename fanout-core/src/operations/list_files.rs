use crate::{FileRecord, MetadataStore, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct ListFilesOperation {
    metadata: Arc<dyn MetadataStore>,
}

#[derive(Debug, Clone)]
pub struct ListFilesOperationResult {
    pub items: Vec<FileRecord>,
}

impl ListFilesOperation {
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// Newest first.
    pub async fn run(&self) -> Result<ListFilesOperationResult> {
        let items = self.metadata.list_all().await?;
        Ok(ListFilesOperationResult { items })
    }
}
