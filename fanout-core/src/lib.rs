//! Fanout Core - content-addressed blob replication across a static node pool

pub mod cluster;
pub mod error;
pub mod fingerprint;
pub mod node;
pub mod operations;
pub mod placement;
pub mod storage;

pub use cluster::*;
pub use error::{FanoutError, Result};
pub use fingerprint::{Fingerprint, compute_hash, fingerprint, verify_hash};
pub use node::{NodeRole, NodeStatusReport};
pub use operations::*;
pub use placement::{DEFAULT_REPLICATION_FACTOR, primary_index, select_candidates};
pub use storage::{
    BlobStore, FileRecord, MetadataStore, NewFileRecord, PutBlobResult, RetryPolicy,
    SqliteMetadataStore, StorageKey, validate_logical_name,
};

#[cfg(test)]
pub(crate) mod testing;
