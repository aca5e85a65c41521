/// DirectMQ 协议消息模型

use serde::{Deserialize, Serialize};

/// 默认 TTL
pub const DEFAULT_TTL: i32 = 32;
/// 仅直连节点可见的 TTL
pub const ONLY_DIRECT_CONNECTION_TTL: i32 = 1;
/// 直连节点并要求回复的 TTL
pub const ONLY_DIRECT_CONNECTION_WITH_RESPONSE_TTL: i32 = 2;
/// 不限制消息大小
pub const NO_MAX_MESSAGE_SIZE: u64 = 0;
/// 未协商的协议版本
pub const UNKNOWN_PROTOCOL_VERSION: u32 = 0;
/// 当前协议版本（DIRECTMQ_V1）
pub const PROTOCOL_VERSION: u32 = 1;

/// 投递策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeliveryStrategy {
    /// 投递给所有匹配的订阅者
    #[default]
    AtLeastOnce,
    /// 只投递给一个随机订阅者
    AtMostOnce,
}

impl DeliveryStrategy {
    pub fn as_u8(self) -> u8 {
        match self {
            DeliveryStrategy::AtLeastOnce => 0,
            DeliveryStrategy::AtMostOnce => 1,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DeliveryStrategy::AtLeastOnce),
            1 => Some(DeliveryStrategy::AtMostOnce),
            _ => None,
        }
    }
}

/// 每条消息携带的数据帧头
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataFrame {
    pub ttl: i32,
    pub traversed: Vec<String>,
}

impl DataFrame {
    pub fn new(ttl: i32, traversed: Vec<String>) -> Self {
        Self { ttl, traversed }
    }

    /// 直连帧：TTL 为 1，经过列表只有本节点
    pub fn direct(host_id: impl Into<String>) -> Self {
        Self::new(ONLY_DIRECT_CONNECTION_TTL, vec![host_id.into()])
    }

    /// 经过本节点转发后的帧：TTL 减一，追加本节点 ID
    pub fn forwarded(&self, host_id: &str) -> Self {
        let mut traversed = self.traversed.clone();
        traversed.push(host_id.to_string());
        Self::new(self.ttl.saturating_sub(1), traversed)
    }

    /// 最近一次经过的节点
    pub fn last_hop(&self) -> Option<&str> {
        self.traversed.last().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SupportedProtocolVersionsMessage {
    pub frame: DataFrame,
    pub supported_protocol_versions: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InitConnectionMessage {
    pub frame: DataFrame,
    pub max_message_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionAcceptedMessage {
    pub frame: DataFrame,
    pub max_message_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GracefullyCloseMessage {
    pub frame: DataFrame,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TerminateNetworkMessage {
    pub frame: DataFrame,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublishMessage {
    pub frame: DataFrame,
    pub topic: String,
    pub delivery_strategy: DeliveryStrategy,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubscribeMessage {
    pub frame: DataFrame,
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnsubscribeMessage {
    pub frame: DataFrame,
    pub topic: String,
}

/// 无法解码的数据包
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MalformedMessage {
    pub frame: DataFrame,
}

/// 协议消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    SupportedProtocolVersions(SupportedProtocolVersionsMessage),
    InitConnection(InitConnectionMessage),
    ConnectionAccepted(ConnectionAcceptedMessage),
    GracefullyClose(GracefullyCloseMessage),
    TerminateNetwork(TerminateNetworkMessage),
    Publish(PublishMessage),
    Subscribe(SubscribeMessage),
    Unsubscribe(UnsubscribeMessage),
    Malformed(MalformedMessage),
}

impl Message {
    pub fn frame(&self) -> &DataFrame {
        match self {
            Message::SupportedProtocolVersions(m) => &m.frame,
            Message::InitConnection(m) => &m.frame,
            Message::ConnectionAccepted(m) => &m.frame,
            Message::GracefullyClose(m) => &m.frame,
            Message::TerminateNetwork(m) => &m.frame,
            Message::Publish(m) => &m.frame,
            Message::Subscribe(m) => &m.frame,
            Message::Unsubscribe(m) => &m.frame,
            Message::Malformed(m) => &m.frame,
        }
    }

    /// 消息类型名称，用于日志
    pub fn kind(&self) -> &'static str {
        match self {
            Message::SupportedProtocolVersions(_) => "supported_protocol_versions",
            Message::InitConnection(_) => "init_connection",
            Message::ConnectionAccepted(_) => "connection_accepted",
            Message::GracefullyClose(_) => "gracefully_close",
            Message::TerminateNetwork(_) => "terminate_network",
            Message::Publish(_) => "publish",
            Message::Subscribe(_) => "subscribe",
            Message::Unsubscribe(_) => "unsubscribe",
            Message::Malformed(_) => "malformed",
        }
    }

    pub fn malformed() -> Self {
        Message::Malformed(MalformedMessage::default())
    }
}
