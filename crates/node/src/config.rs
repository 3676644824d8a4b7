use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use floodmesh::NodeConfig;

pub const DEFAULT_PORT: u16 = 47100;

/// Node settings shared by every mode. Explicit flags override the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct NodeArgs {
    #[arg(long, help = "JSON file with node configuration")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Node identity (0-254)")]
    pub node_id: Option<u8>,

    #[arg(long, help = "Hop budget for originated floods")]
    pub ttl: Option<u8>,

    #[arg(long, help = "Hop budget for acknowledgments")]
    pub ack_ttl: Option<u8>,

    #[arg(long, help = "Milliseconds to wait for an ACK before retrying")]
    pub ack_timeout_ms: Option<u64>,

    #[arg(long, help = "Retransmissions before a delivery is reported failed")]
    pub max_retries: Option<u8>,

    #[arg(long, help = "Capacity of the duplicate cache")]
    pub dedup_capacity: Option<usize>,

    #[arg(long, help = "Concurrent deliveries tracked for acknowledgment")]
    pub pending_capacity: Option<usize>,
}

impl NodeArgs {
    pub fn resolve(&self) -> Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("failed to parse {}", path.display()))?
            }
            None => NodeConfig::default(),
        };

        if let Some(node_id) = self.node_id {
            config.node_id = node_id;
        }
        if let Some(ttl) = self.ttl {
            config.default_ttl = ttl;
        }
        if let Some(ack_ttl) = self.ack_ttl {
            config.ack_ttl = ack_ttl;
        }
        if let Some(timeout) = self.ack_timeout_ms {
            config.ack_timeout_ms = timeout;
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        if let Some(capacity) = self.dedup_capacity {
            config.dedup_capacity = capacity;
        }
        if let Some(capacity) = self.pending_capacity {
            config.pending_capacity = capacity;
        }

        config.validate().context("invalid node configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = NodeArgs {
            node_id: Some(7),
            ttl: Some(3),
            max_retries: Some(0),
            ..Default::default()
        };

        let config = args.resolve().unwrap();
        assert_eq!(config.node_id, 7);
        assert_eq!(config.default_ttl, 3);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.ack_timeout_ms, NodeConfig::default().ack_timeout_ms);
    }

    #[test]
    fn test_invalid_node_rejected() {
        let args = NodeArgs {
            node_id: Some(0xFF),
            ..Default::default()
        };
        assert!(args.resolve().is_err());
    }
}
