use crate::error::{FanoutError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Gateway,
    Storage,
}

impl NodeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Gateway => "gateway",
            NodeRole::Storage => "storage",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeRole {
    type Err = FanoutError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gateway" => Ok(NodeRole::Gateway),
            "storage" => Ok(NodeRole::Storage),
            other => Err(FanoutError::Config(format!("unknown node role: {}", other))),
        }
    }
}

/// Introspection payload served by every storage node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeStatusReport {
    pub node_id: String,
    pub role: NodeRole,
    pub local_item_count: u64,
}
