/// directmq.v1 线上结构
///
/// 使用 prost 派生宏手写的 protobuf 定义，与 directmq.v1 schema 保持一致

use super::messages::{
    ConnectionAcceptedMessage, DataFrame as Frame, DeliveryStrategy as Strategy,
    GracefullyCloseMessage, InitConnectionMessage, MalformedMessage, Message as ProtocolMessage,
    PublishMessage, SubscribeMessage, SupportedProtocolVersionsMessage, TerminateNetworkMessage,
    UnsubscribeMessage,
};
use crate::errors::{Error, Result};

#[derive(Clone, PartialEq, prost::Message)]
pub struct SupportedProtocolVersions {
    #[prost(uint32, repeated, tag = "1")]
    pub supported_protocol_versions: Vec<u32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct InitConnection {
    #[prost(uint64, tag = "1")]
    pub max_message_size: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ConnectionAccepted {
    #[prost(uint64, tag = "1")]
    pub max_message_size: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GracefullyClose {
    #[prost(string, tag = "1")]
    pub reason: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TerminateNetwork {
    #[prost(string, tag = "1")]
    pub reason: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum DeliveryStrategy {
    AtLeastOnceUnspecified = 0,
    AtMostOnce = 1,
}

impl DeliveryStrategy {
    /// protobuf 枚举名
    pub fn as_str_name(&self) -> &'static str {
        match self {
            DeliveryStrategy::AtLeastOnceUnspecified => "DELIVERY_STRATEGY_AT_LEAST_ONCE_UNSPECIFIED",
            DeliveryStrategy::AtMostOnce => "DELIVERY_STRATEGY_AT_MOST_ONCE",
        }
    }

    pub fn from_str_name(value: &str) -> Option<Self> {
        match value {
            "DELIVERY_STRATEGY_AT_LEAST_ONCE_UNSPECIFIED" => Some(DeliveryStrategy::AtLeastOnceUnspecified),
            "DELIVERY_STRATEGY_AT_MOST_ONCE" => Some(DeliveryStrategy::AtMostOnce),
            _ => None,
        }
    }
}

impl From<Strategy> for DeliveryStrategy {
    fn from(value: Strategy) -> Self {
        match value {
            Strategy::AtLeastOnce => DeliveryStrategy::AtLeastOnceUnspecified,
            Strategy::AtMostOnce => DeliveryStrategy::AtMostOnce,
        }
    }
}

impl From<DeliveryStrategy> for Strategy {
    fn from(value: DeliveryStrategy) -> Self {
        match value {
            DeliveryStrategy::AtLeastOnceUnspecified => Strategy::AtLeastOnce,
            DeliveryStrategy::AtMostOnce => Strategy::AtMostOnce,
        }
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Publish {
    #[prost(string, tag = "1")]
    pub topic: String,

    #[prost(enumeration = "DeliveryStrategy", tag = "2")]
    pub delivery_strategy: i32,

    /// 负载长度，读取时忽略
    #[prost(uint64, tag = "3")]
    pub size: u64,

    #[prost(bytes = "vec", tag = "4")]
    pub payload: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Subscribe {
    #[prost(string, tag = "1")]
    pub topic: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Unsubscribe {
    #[prost(string, tag = "1")]
    pub topic: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DataFrame {
    #[prost(int32, tag = "1")]
    pub ttl: i32,

    #[prost(string, repeated, tag = "2")]
    pub traversed: Vec<String>,

    #[prost(oneof = "data_frame::Message", tags = "3, 4, 5, 6, 7, 8, 9, 10")]
    pub message: Option<data_frame::Message>,
}

pub mod data_frame {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Message {
        #[prost(message, tag = "3")]
        SupportedProtocolVersions(super::SupportedProtocolVersions),
        #[prost(message, tag = "4")]
        InitConnection(super::InitConnection),
        #[prost(message, tag = "5")]
        ConnectionAccepted(super::ConnectionAccepted),
        #[prost(message, tag = "6")]
        Publish(super::Publish),
        #[prost(message, tag = "7")]
        Subscribe(super::Subscribe),
        #[prost(message, tag = "8")]
        Unsubscribe(super::Unsubscribe),
        #[prost(message, tag = "9")]
        GracefullyClose(super::GracefullyClose),
        #[prost(message, tag = "10")]
        TerminateNetwork(super::TerminateNetwork),
    }
}

// ==================== 模型与线上结构互转 ====================

impl DataFrame {
    fn with_message(frame: &Frame, message: data_frame::Message) -> Self {
        Self {
            ttl: frame.ttl,
            traversed: frame.traversed.clone(),
            message: Some(message),
        }
    }

    fn header(&self) -> Frame {
        Frame::new(self.ttl, self.traversed.clone())
    }
}

impl TryFrom<&ProtocolMessage> for DataFrame {
    type Error = Error;

    fn try_from(message: &ProtocolMessage) -> Result<Self> {
        use data_frame::Message as Wire;

        let frame = match message {
            ProtocolMessage::SupportedProtocolVersions(m) => DataFrame::with_message(
                &m.frame,
                Wire::SupportedProtocolVersions(SupportedProtocolVersions {
                    supported_protocol_versions: m.supported_protocol_versions.clone(),
                }),
            ),
            ProtocolMessage::InitConnection(m) => DataFrame::with_message(
                &m.frame,
                Wire::InitConnection(InitConnection {
                    max_message_size: m.max_message_size,
                }),
            ),
            ProtocolMessage::ConnectionAccepted(m) => DataFrame::with_message(
                &m.frame,
                Wire::ConnectionAccepted(ConnectionAccepted {
                    max_message_size: m.max_message_size,
                }),
            ),
            ProtocolMessage::GracefullyClose(m) => DataFrame::with_message(
                &m.frame,
                Wire::GracefullyClose(GracefullyClose {
                    reason: m.reason.clone(),
                }),
            ),
            ProtocolMessage::TerminateNetwork(m) => DataFrame::with_message(
                &m.frame,
                Wire::TerminateNetwork(TerminateNetwork {
                    reason: m.reason.clone(),
                }),
            ),
            ProtocolMessage::Publish(m) => DataFrame::with_message(
                &m.frame,
                Wire::Publish(Publish {
                    topic: m.topic.clone(),
                    delivery_strategy: DeliveryStrategy::from(m.delivery_strategy) as i32,
                    size: m.payload.len() as u64,
                    payload: m.payload.clone(),
                }),
            ),
            ProtocolMessage::Subscribe(m) => DataFrame::with_message(
                &m.frame,
                Wire::Subscribe(Subscribe {
                    topic: m.topic.clone(),
                }),
            ),
            ProtocolMessage::Unsubscribe(m) => DataFrame::with_message(
                &m.frame,
                Wire::Unsubscribe(Unsubscribe {
                    topic: m.topic.clone(),
                }),
            ),
            ProtocolMessage::Malformed(_) => {
                return Err(Error::Protocol("无法编码格式错误的消息".to_string()));
            }
        };

        Ok(frame)
    }
}

impl From<DataFrame> for ProtocolMessage {
    fn from(value: DataFrame) -> Self {
        use data_frame::Message as Wire;

        let frame = value.header();
        match value.message {
            Some(Wire::SupportedProtocolVersions(m)) => {
                ProtocolMessage::SupportedProtocolVersions(SupportedProtocolVersionsMessage {
                    frame,
                    supported_protocol_versions: m.supported_protocol_versions,
                })
            }
            Some(Wire::InitConnection(m)) => ProtocolMessage::InitConnection(InitConnectionMessage {
                frame,
                max_message_size: m.max_message_size,
            }),
            Some(Wire::ConnectionAccepted(m)) => {
                ProtocolMessage::ConnectionAccepted(ConnectionAcceptedMessage {
                    frame,
                    max_message_size: m.max_message_size,
                })
            }
            Some(Wire::GracefullyClose(m)) => ProtocolMessage::GracefullyClose(GracefullyCloseMessage {
                frame,
                reason: m.reason,
            }),
            Some(Wire::TerminateNetwork(m)) => {
                ProtocolMessage::TerminateNetwork(TerminateNetworkMessage {
                    frame,
                    reason: m.reason,
                })
            }
            Some(Wire::Publish(m)) => {
                let delivery_strategy = DeliveryStrategy::try_from(m.delivery_strategy)
                    .unwrap_or(DeliveryStrategy::AtLeastOnceUnspecified);
                ProtocolMessage::Publish(PublishMessage {
                    frame,
                    topic: m.topic,
                    delivery_strategy: delivery_strategy.into(),
                    payload: m.payload,
                })
            }
            Some(Wire::Subscribe(m)) => ProtocolMessage::Subscribe(SubscribeMessage {
                frame,
                topic: m.topic,
            }),
            Some(Wire::Unsubscribe(m)) => ProtocolMessage::Unsubscribe(UnsubscribeMessage {
                frame,
                topic: m.topic,
            }),
            None => ProtocolMessage::Malformed(MalformedMessage { frame }),
        }
    }
}
