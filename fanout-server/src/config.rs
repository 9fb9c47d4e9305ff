use fanout_core::{
    FanoutError, NodePool, NodeRole, PoolNode, ReplicationSettings, Result, RetryPolicy,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    #[serde(default)]
    pub pool: Vec<PoolNode>,
    #[serde(default)]
    pub replication: ReplicationConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub node_id: String,
    pub role: NodeRole,
    pub bind_addr: String,
    pub data_dir: PathBuf,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_max_body_bytes() -> usize {
    256 * 1024 * 1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationConfig {
    #[serde(default = "default_replication_factor")]
    pub replication_factor: usize,
    #[serde(default = "default_write_quorum")]
    pub write_quorum: usize,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_verify_integrity")]
    pub verify_integrity: bool,
}

fn default_replication_factor() -> usize {
    fanout_core::DEFAULT_REPLICATION_FACTOR
}

fn default_write_quorum() -> usize {
    2
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_verify_integrity() -> bool {
    true
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            replication_factor: default_replication_factor(),
            write_quorum: default_write_quorum(),
            request_timeout_ms: default_request_timeout_ms(),
            verify_integrity: default_verify_integrity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Defaults to `{data_dir}/files.sqlite3`.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_connect_attempts() -> u32 {
    15
}

fn default_retry_delay_ms() -> u64 {
    3000
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            connect_attempts: default_connect_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path))
            .add_source(
                ::config::Environment::with_prefix("FANOUT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| FanoutError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| FanoutError::Config(e.to_string()))?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node.node_id.trim().is_empty() {
            return Err(FanoutError::Config("node.node_id cannot be empty".to_string()));
        }

        if self.node.bind_addr.trim().is_empty() {
            return Err(FanoutError::Config(
                "node.bind_addr cannot be empty".to_string(),
            ));
        }

        if self.replication.replication_factor == 0 {
            return Err(FanoutError::Config(
                "replication.replication_factor must be at least 1".to_string(),
            ));
        }

        if self.replication.write_quorum == 0
            || self.replication.write_quorum > self.replication.replication_factor
        {
            return Err(FanoutError::Config(format!(
                "replication.write_quorum must be between 1 and {}, got {}",
                self.replication.replication_factor, self.replication.write_quorum
            )));
        }

        if self.node.role == NodeRole::Gateway {
            if self.pool.is_empty() {
                return Err(FanoutError::Config(
                    "gateway requires at least one pool node".to_string(),
                ));
            }
            self.node_pool()?;
        }

        Ok(())
    }

    pub fn node_pool(&self) -> Result<NodePool> {
        NodePool::new(self.pool.clone())
    }

    pub fn replication_settings(&self) -> ReplicationSettings {
        ReplicationSettings {
            replication_factor: self.replication.replication_factor,
            write_quorum: self.replication.write_quorum,
            request_timeout: Duration::from_millis(self.replication.request_timeout_ms),
            verify_integrity: self.replication.verify_integrity,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.metadata.connect_attempts.max(1),
            initial_delay: Duration::from_millis(self.metadata.retry_delay_ms),
            ..RetryPolicy::default()
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.metadata
            .db_path
            .clone()
            .unwrap_or_else(|| self.node.data_dir.join("files.sqlite3"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const GATEWAY_YAML: &str = r#"
node:
  node_id: gateway-1
  role: gateway
  bind_addr: 127.0.0.1:8400
  data_dir: /tmp/fanout/gateway-1
pool:
  - node_id: storage-1
    address: 127.0.0.1:8401
  - node_id: storage-2
    address: 127.0.0.1:8402
replication:
  request_timeout_ms: 750
"#;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_gateway_config_with_defaults() {
        let file = write_config(GATEWAY_YAML);
        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.node.role, NodeRole::Gateway);
        assert_eq!(config.pool.len(), 2);
        assert_eq!(config.replication.replication_factor, 3);
        assert_eq!(config.replication.write_quorum, 2);
        assert!(config.replication.verify_integrity);
        assert_eq!(
            config.replication_settings().request_timeout,
            Duration::from_millis(750)
        );
        assert_eq!(config.metadata.connect_attempts, 15);
        assert_eq!(
            config.db_path(),
            PathBuf::from("/tmp/fanout/gateway-1/files.sqlite3")
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_validation_rules() {
        let file = write_config(GATEWAY_YAML);
        let base = Config::from_file(file.path().to_str().unwrap()).unwrap();

        let mut no_pool = base.clone();
        no_pool.pool.clear();
        assert!(no_pool.validate().is_err());

        let mut storage_without_pool = no_pool.clone();
        storage_without_pool.node.role = NodeRole::Storage;
        assert!(storage_without_pool.validate().is_ok());

        let mut duplicate = base.clone();
        duplicate.pool.push(duplicate.pool[0].clone());
        assert!(duplicate.validate().is_err());

        let mut quorum_too_large = base.clone();
        quorum_too_large.replication.write_quorum = 4;
        assert!(quorum_too_large.validate().is_err());

        let mut zero_factor = base;
        zero_factor.replication.replication_factor = 0;
        assert!(zero_factor.validate().is_err());
    }
}
