use serde::{Deserialize, Serialize};

use crate::net::{
    BROADCAST, DEFAULT_ACK_TIMEOUT_MS, DEFAULT_DEDUP_CAPACITY, DEFAULT_MAX_RETRIES,
    DEFAULT_PENDING_CAPACITY, DEFAULT_TTL,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("node id {0:#04x} is reserved for broadcast")]
    ReservedNodeId(u8),
    #[error("dedup capacity must be at least 1")]
    ZeroDedupCapacity,
    #[error("pending capacity must be at least 1")]
    ZeroPendingCapacity,
    #[error("ack timeout must be greater than zero")]
    ZeroAckTimeout,
}

/// Startup configuration of one mesh node. Fixed for the node's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub node_id: u8,
    /// Hop budget for locally originated floods.
    pub default_ttl: u8,
    pub ack_ttl: u8,
    pub dedup_capacity: usize,
    pub pending_capacity: usize,
    pub ack_timeout_ms: u64,
    pub max_retries: u8,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: 1,
            default_ttl: DEFAULT_TTL,
            ack_ttl: DEFAULT_TTL,
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
            pending_capacity: DEFAULT_PENDING_CAPACITY,
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl NodeConfig {
    pub fn for_node(node_id: u8) -> Self {
        Self {
            node_id,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_id == BROADCAST {
            return Err(ConfigError::ReservedNodeId(self.node_id));
        }
        if self.dedup_capacity == 0 {
            return Err(ConfigError::ZeroDedupCapacity);
        }
        if self.pending_capacity == 0 {
            return Err(ConfigError::ZeroPendingCapacity);
        }
        if self.ack_timeout_ms == 0 {
            return Err(ConfigError::ZeroAckTimeout);
        }
        Ok(())
    }
}
