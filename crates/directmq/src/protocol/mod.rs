/// DirectMQ 协议
///
/// 消息模型、directmq.v1 线上结构以及二进制 / JSON 两种编解码格式

pub mod json;
pub mod messages;
pub mod wire;

pub use messages::*;

use prost::Message as _;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

use crate::errors::{Error, Result};

/// 协议编解码器
pub trait Protocol: Send + Sync {
    /// 编码消息，格式错误的消息无法编码
    fn encode(&self, message: &Message) -> Result<Vec<u8>>;

    /// 解码数据包，失败时返回 `Message::Malformed`
    fn decode(&self, packet: &[u8]) -> Message;
}

/// protobuf 编码格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtobufFormat {
    #[default]
    Binary,
    Json,
}

impl FromStr for ProtobufFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "binary" | "protobuf" => Ok(ProtobufFormat::Binary),
            "json" => Ok(ProtobufFormat::Json),
            other => Err(Error::InvalidArgument(format!("未知协议格式: {}", other))),
        }
    }
}

/// 基于 protobuf 的协议实现
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtobufProtocol {
    format: ProtobufFormat,
}

impl ProtobufProtocol {
    pub fn new(format: ProtobufFormat) -> Self {
        Self { format }
    }

    pub fn binary() -> Self {
        Self::new(ProtobufFormat::Binary)
    }

    pub fn json() -> Self {
        Self::new(ProtobufFormat::Json)
    }

    pub fn format(&self) -> ProtobufFormat {
        self.format
    }
}

impl Protocol for ProtobufProtocol {
    fn encode(&self, message: &Message) -> Result<Vec<u8>> {
        let frame = wire::DataFrame::try_from(message)?;
        match self.format {
            ProtobufFormat::Binary => Ok(frame.encode_to_vec()),
            ProtobufFormat::Json => json::to_json(&frame),
        }
    }

    fn decode(&self, packet: &[u8]) -> Message {
        let decoded = match self.format {
            ProtobufFormat::Binary => wire::DataFrame::decode(packet).map_err(Error::from),
            ProtobufFormat::Json => json::from_json(packet),
        };

        match decoded {
            Ok(frame) => frame.into(),
            Err(e) => {
                debug!("解码数据包失败: {}", e);
                Message::malformed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publish_message() -> Message {
        Message::Publish(PublishMessage {
            frame: DataFrame::new(31, vec!["a".to_string(), "b".to_string()]),
            topic: "test/topic".to_string(),
            delivery_strategy: DeliveryStrategy::AtMostOnce,
            payload: b"test".to_vec(),
        })
    }

    #[test]
    fn test_binary_roundtrip() {
        let protocol = ProtobufProtocol::binary();
        let message = publish_message();
        let packet = protocol.encode(&message).unwrap();
        assert_eq!(protocol.decode(&packet), message);
    }

    #[test]
    fn test_json_layout() {
        let protocol = ProtobufProtocol::json();
        let packet = protocol.encode(&publish_message()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&packet).unwrap();

        assert_eq!(value["ttl"], 31);
        assert_eq!(value["traversed"], serde_json::json!(["a", "b"]));
        assert_eq!(value["publish"]["topic"], "test/topic");
        assert_eq!(value["publish"]["deliveryStrategy"], "DELIVERY_STRATEGY_AT_MOST_ONCE");
        assert_eq!(value["publish"]["size"], "4");
        assert_eq!(value["publish"]["payload"], "dGVzdA==");
    }

    #[test]
    fn test_json_decode_accepts_numbers_and_field_names() {
        let protocol = ProtobufProtocol::json();
        let packet = br#"{"ttl":1,"traversed":["x"],"init_connection":{"max_message_size":5}}"#;
        assert_eq!(
            protocol.decode(packet),
            Message::InitConnection(InitConnectionMessage {
                frame: DataFrame::new(1, vec!["x".to_string()]),
                max_message_size: 5,
            })
        );

        let packet = br#"{"ttl":1,"connectionAccepted":{"maxMessageSize":"7"}}"#;
        assert_eq!(
            protocol.decode(packet),
            Message::ConnectionAccepted(ConnectionAcceptedMessage {
                frame: DataFrame::new(1, vec![]),
                max_message_size: 7,
            })
        );
    }

    #[test]
    fn test_json_empty_submessage() {
        let protocol = ProtobufProtocol::json();
        let message = Message::GracefullyClose(GracefullyCloseMessage {
            frame: DataFrame::direct("a"),
            reason: String::new(),
        });
        let packet = protocol.encode(&message).unwrap();
        assert_eq!(packet, br#"{"ttl":1,"traversed":["a"],"gracefullyClose":{}}"#.to_vec());
        assert_eq!(protocol.decode(&packet), message);
    }

    #[test]
    fn test_malformed_packets() {
        let binary = ProtobufProtocol::binary();
        assert!(matches!(binary.decode(&[0xff, 0xff, 0xff]), Message::Malformed(_)));
        assert!(matches!(binary.decode(&[]), Message::Malformed(_)));

        let json = ProtobufProtocol::json();
        assert!(matches!(json.decode(b"not json"), Message::Malformed(_)));
        assert!(matches!(json.decode(b"{\"ttl\":1}"), Message::Malformed(_)));
        assert!(matches!(
            json.decode(br#"{"subscribe":{"topic":"a"},"unsubscribe":{"topic":"a"}}"#),
            Message::Malformed(_)
        ));
    }

    #[test]
    fn test_encode_malformed_fails() {
        let protocol = ProtobufProtocol::binary();
        assert!(protocol.encode(&Message::malformed()).is_err());
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JSON".parse::<ProtobufFormat>().unwrap(), ProtobufFormat::Json);
        assert_eq!("binary".parse::<ProtobufFormat>().unwrap(), ProtobufFormat::Binary);
        assert!("xml".parse::<ProtobufFormat>().is_err());
    }
}
