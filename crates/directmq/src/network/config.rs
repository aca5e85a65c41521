/// 节点配置

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::protocol::{DEFAULT_TTL, NO_MAX_MESSAGE_SIZE};
use crate::utils::generate_id;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkNodeConfig {
    /// 本节点发出消息的初始 TTL
    pub host_ttl: i32,
    /// 本节点可接收的最大负载，0 表示不限制
    pub host_max_incoming_message_size: u64,
    /// 本节点在网络中的唯一 ID
    pub host_id: String,
}

impl Default for NetworkNodeConfig {
    fn default() -> Self {
        Self {
            host_ttl: DEFAULT_TTL,
            host_max_incoming_message_size: NO_MAX_MESSAGE_SIZE,
            host_id: generate_id(),
        }
    }
}

impl NetworkNodeConfig {
    pub fn new(host_id: impl Into<String>) -> Self {
        Self {
            host_id: host_id.into(),
            ..Default::default()
        }
    }

    pub fn with_ttl(mut self, ttl: i32) -> Self {
        self.host_ttl = ttl;
        self
    }

    pub fn with_max_incoming_message_size(mut self, size: u64) -> Self {
        self.host_max_incoming_message_size = size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.host_id.is_empty() {
            return Err(Error::InvalidArgument("节点 ID 不能为空".to_string()));
        }
        if self.host_ttl <= 0 {
            return Err(Error::InvalidArgument(format!("TTL 必须大于 0: {}", self.host_ttl)));
        }
        Ok(())
    }
}
