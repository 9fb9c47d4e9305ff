pub mod client;
pub mod types;

pub use client::{FINGERPRINT_HEADER, HttpNodeClient, NodeClient, StoreReceipt};
pub use types::{Coordinator, NodePool, PoolNode, ReplicationSettings};
