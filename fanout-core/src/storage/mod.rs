//! Storage modules for fanout
//!
//! Local blob files on storage nodes, file metadata on the gateway.

pub mod blob_store;
pub mod file_records;

pub use blob_store::{BlobStore, PutBlobResult, StorageKey, validate_logical_name};
pub use file_records::{
    FileRecord, MetadataStore, NewFileRecord, RetryPolicy, SqliteMetadataStore,
};
