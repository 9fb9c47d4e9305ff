pub mod download_file;
pub mod get_file;
pub mod internal_retrieve_blob;
pub mod internal_store_blob;
pub mod list_files;
pub mod node_status;
pub mod upload_file;

pub use download_file::{
    DownloadFileOperation, DownloadFileOperationOutcome, DownloadFileOperationRequest,
    DownloadFileOperationResult,
};
pub use get_file::{GetFileOperation, GetFileOperationOutcome, GetFileOperationRequest};
pub use internal_retrieve_blob::{
    InternalBlobPayload, InternalRetrieveBlobOperation, InternalRetrieveBlobOperationOutcome,
    InternalRetrieveBlobOperationRequest,
};
pub use internal_store_blob::{
    InternalStoreBlobOperation, InternalStoreBlobOperationRequest,
    InternalStoreBlobOperationResult,
};
pub use list_files::{ListFilesOperation, ListFilesOperationResult};
pub use node_status::NodeStatusOperation;
pub use upload_file::{
    ReplicationOutcome, UploadFileOperation, UploadFileOperationRequest,
    UploadFileOperationResult,
};
