/// 网络边
///
/// 每条边对应一个 Portal，记录对端节点信息及连接状态

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::portal::Portal;
use crate::protocol::{DataFrame, UNKNOWN_PROTOCOL_VERSION};
use crate::subscription::SubscriptionList;

/// 边 ID，在单个节点内唯一
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub u64);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "edge-{}", self.0)
    }
}

/// 边的建立方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeRole {
    /// 被动接受连接，等待对端发起握手
    Listening,
    /// 主动连接，由本端发起握手
    Connecting,
}

/// 边状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeState {
    Connecting,
    Connected,
    Disconnecting(String),
    Disconnected(String),
}

impl EdgeState {
    pub fn name(&self) -> &'static str {
        match self {
            EdgeState::Connecting => "connecting",
            EdgeState::Connected => "connected",
            EdgeState::Disconnecting(_) => "disconnecting",
            EdgeState::Disconnected(_) => "disconnected",
        }
    }
}

/// 对端节点信息
#[derive(Debug, Clone)]
pub(crate) struct EdgeInfo {
    pub negotiated_protocol_version: u32,
    pub bridged_node_supported_protocol_versions: Vec<u32>,
    pub bridged_node_id: String,
    pub bridged_node_max_message_size: u64,
    pub bridged_node_subscriptions: SubscriptionList<()>,
    /// 已经通告给对端的顶层主题
    pub advertised_topics: Vec<String>,
}

impl Default for EdgeInfo {
    fn default() -> Self {
        Self {
            negotiated_protocol_version: UNKNOWN_PROTOCOL_VERSION,
            bridged_node_supported_protocol_versions: Vec::new(),
            bridged_node_id: String::new(),
            bridged_node_max_message_size: 0,
            bridged_node_subscriptions: SubscriptionList::new(),
            advertised_topics: Vec::new(),
        }
    }
}

pub(crate) struct NetworkEdge {
    pub id: EdgeId,
    pub role: EdgeRole,
    pub portal: Arc<dyn Portal>,
    pub state: EdgeState,
    pub info: EdgeInfo,
}

impl NetworkEdge {
    pub fn new(id: EdgeId, role: EdgeRole, portal: Arc<dyn Portal>) -> Self {
        Self {
            id,
            role,
            portal,
            state: EdgeState::Connecting,
            info: EdgeInfo::default(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == EdgeState::Connected
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self.state, EdgeState::Disconnected(_))
    }

    /// 帧的上一跳是否为对端节点
    pub fn is_origin_of(&self, frame: &DataFrame) -> bool {
        !self.info.bridged_node_id.is_empty()
            && frame.last_hop() == Some(self.info.bridged_node_id.as_str())
    }

    /// 对端订阅的顶层主题，仅在已连接时有效
    pub fn subscribed_topics(&self) -> Vec<String> {
        if !self.is_connected() {
            return Vec::new();
        }
        self.info.bridged_node_subscriptions.top_level_topics()
    }

    pub fn snapshot(&self) -> EdgeSnapshot {
        let bridged_node_id = if self.info.bridged_node_id.is_empty() {
            None
        } else {
            Some(self.info.bridged_node_id.clone())
        };

        EdgeSnapshot {
            id: self.id,
            role: self.role,
            state: self.state.name().to_string(),
            bridged_node_id,
            subscriptions: self.subscribed_topics(),
        }
    }
}

/// 边的只读快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSnapshot {
    pub id: EdgeId,
    pub role: EdgeRole,
    pub state: String,
    pub bridged_node_id: Option<String>,
    pub subscriptions: Vec<String>,
}
