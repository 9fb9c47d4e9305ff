use crate::{FileRecord, MetadataStore, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct GetFileOperation {
    metadata: Arc<dyn MetadataStore>,
}

#[derive(Debug, Clone)]
pub struct GetFileOperationRequest {
    pub file_id: i64,
}

#[derive(Debug, Clone)]
pub enum GetFileOperationOutcome {
    Found(FileRecord),
    NotFound,
}

impl GetFileOperation {
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    pub async fn run(&self, request: GetFileOperationRequest) -> Result<GetFileOperationOutcome> {
        match self.metadata.get_by_id(request.file_id).await? {
            Some(record) => Ok(GetFileOperationOutcome::Found(record)),
            None => Ok(GetFileOperationOutcome::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::ListFilesOperation;
    use crate::testing::sqlite_store;
    use crate::{NewFileRecord, fingerprint};

    #[tokio::test]
    async fn test_get_and_list() {
        let (_dir, metadata) = sqlite_store();

        let mut ids = Vec::new();
        for name in ["first.txt", "second.txt"] {
            let id = metadata
                .insert(NewFileRecord {
                    logical_name: name.to_string(),
                    fingerprint: fingerprint(name.as_bytes()),
                    size_bytes: name.len() as u64,
                    candidate_nodes: vec!["node-0".to_string()],
                    uploader: "carol".to_string(),
                })
                .await
                .unwrap();
            ids.push(id);
        }

        let get = GetFileOperation::new(metadata.clone());
        match get
            .run(GetFileOperationRequest { file_id: ids[0] })
            .await
            .unwrap()
        {
            GetFileOperationOutcome::Found(record) => {
                assert_eq!(record.logical_name, "first.txt");
                assert_eq!(record.uploader, "carol");
            }
            GetFileOperationOutcome::NotFound => panic!("expected record"),
        }
        assert!(matches!(
            get.run(GetFileOperationRequest { file_id: -1 })
                .await
                .unwrap(),
            GetFileOperationOutcome::NotFound
        ));

        let listed = ListFilesOperation::new(metadata).run().await.unwrap();
        let names: Vec<_> = listed
            .items
            .iter()
            .map(|record| record.logical_name.as_str())
            .collect();
        assert_eq!(names, vec!["second.txt", "first.txt"]);
    }
}
