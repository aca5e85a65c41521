/// protobuf JSON 映射
///
/// 字段名使用 lowerCamelCase（读取时兼容原始字段名），uint64 写为字符串，
/// bytes 使用标准 base64，枚举按名称输出，默认值省略

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::wire::{self, data_frame, DeliveryStrategy};
use crate::errors::{Error, Result};

fn is_zero_i32(value: &i32) -> bool {
    *value == 0
}

fn is_zero_u64(value: &u64) -> bool {
    *value == 0
}

fn is_default_strategy(value: &i32) -> bool {
    *value == DeliveryStrategy::AtLeastOnceUnspecified as i32
}

/// uint64 按字符串输出，读取时兼容数字
mod u64_string {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u64),
    }

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
        match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::String(value) => value.parse().map_err(serde::de::Error::custom),
            StringOrNumber::Number(value) => Ok(value),
        }
    }
}

/// bytes 按 base64 输出
mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error> {
        let value = String::deserialize(deserializer)?;
        STANDARD.decode(value).map_err(serde::de::Error::custom)
    }
}

/// 枚举按名称输出，读取时兼容数字
mod strategy_name {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NameOrNumber {
        Name(String),
        Number(i32),
    }

    pub fn serialize<S: Serializer>(value: &i32, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match DeliveryStrategy::try_from(*value) {
            Ok(strategy) => serializer.serialize_str(strategy.as_str_name()),
            Err(_) => serializer.serialize_i32(*value),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i32, D::Error> {
        match NameOrNumber::deserialize(deserializer)? {
            NameOrNumber::Name(name) => DeliveryStrategy::from_str_name(&name)
                .map(|strategy| strategy as i32)
                .ok_or_else(|| serde::de::Error::custom(format!("未知投递策略: {}", name))),
            NameOrNumber::Number(value) => Ok(value),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonSupportedProtocolVersions {
    #[serde(default, alias = "supported_protocol_versions", skip_serializing_if = "Vec::is_empty")]
    supported_protocol_versions: Vec<u32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonMaxMessageSize {
    #[serde(
        default,
        alias = "max_message_size",
        with = "u64_string",
        skip_serializing_if = "is_zero_u64"
    )]
    max_message_size: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct JsonReason {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    reason: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct JsonTopic {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    topic: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonPublish {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    topic: String,
    #[serde(
        default,
        alias = "delivery_strategy",
        with = "strategy_name",
        skip_serializing_if = "is_default_strategy"
    )]
    delivery_strategy: i32,
    #[serde(default, with = "u64_string", skip_serializing_if = "is_zero_u64")]
    size: u64,
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    payload: Vec<u8>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonDataFrame {
    #[serde(default, skip_serializing_if = "is_zero_i32")]
    ttl: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    traversed: Vec<String>,
    #[serde(default, alias = "supported_protocol_versions", skip_serializing_if = "Option::is_none")]
    supported_protocol_versions: Option<JsonSupportedProtocolVersions>,
    #[serde(default, alias = "init_connection", skip_serializing_if = "Option::is_none")]
    init_connection: Option<JsonMaxMessageSize>,
    #[serde(default, alias = "connection_accepted", skip_serializing_if = "Option::is_none")]
    connection_accepted: Option<JsonMaxMessageSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    publish: Option<JsonPublish>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subscribe: Option<JsonTopic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unsubscribe: Option<JsonTopic>,
    #[serde(default, alias = "gracefully_close", skip_serializing_if = "Option::is_none")]
    gracefully_close: Option<JsonReason>,
    #[serde(default, alias = "terminate_network", skip_serializing_if = "Option::is_none")]
    terminate_network: Option<JsonReason>,
}

impl JsonDataFrame {
    fn set_members(&self) -> usize {
        [
            self.supported_protocol_versions.is_some(),
            self.init_connection.is_some(),
            self.connection_accepted.is_some(),
            self.publish.is_some(),
            self.subscribe.is_some(),
            self.unsubscribe.is_some(),
            self.gracefully_close.is_some(),
            self.terminate_network.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}

impl From<&wire::DataFrame> for JsonDataFrame {
    fn from(value: &wire::DataFrame) -> Self {
        let mut json = JsonDataFrame {
            ttl: value.ttl,
            traversed: value.traversed.clone(),
            ..Default::default()
        };

        match &value.message {
            Some(data_frame::Message::SupportedProtocolVersions(m)) => {
                json.supported_protocol_versions = Some(JsonSupportedProtocolVersions {
                    supported_protocol_versions: m.supported_protocol_versions.clone(),
                });
            }
            Some(data_frame::Message::InitConnection(m)) => {
                json.init_connection = Some(JsonMaxMessageSize {
                    max_message_size: m.max_message_size,
                });
            }
            Some(data_frame::Message::ConnectionAccepted(m)) => {
                json.connection_accepted = Some(JsonMaxMessageSize {
                    max_message_size: m.max_message_size,
                });
            }
            Some(data_frame::Message::Publish(m)) => {
                json.publish = Some(JsonPublish {
                    topic: m.topic.clone(),
                    delivery_strategy: m.delivery_strategy,
                    size: m.size,
                    payload: m.payload.clone(),
                });
            }
            Some(data_frame::Message::Subscribe(m)) => {
                json.subscribe = Some(JsonTopic { topic: m.topic.clone() });
            }
            Some(data_frame::Message::Unsubscribe(m)) => {
                json.unsubscribe = Some(JsonTopic { topic: m.topic.clone() });
            }
            Some(data_frame::Message::GracefullyClose(m)) => {
                json.gracefully_close = Some(JsonReason { reason: m.reason.clone() });
            }
            Some(data_frame::Message::TerminateNetwork(m)) => {
                json.terminate_network = Some(JsonReason { reason: m.reason.clone() });
            }
            None => {}
        }

        json
    }
}

impl From<JsonDataFrame> for wire::DataFrame {
    fn from(json: JsonDataFrame) -> Self {
        let message = if json.set_members() != 1 {
            None
        } else if let Some(m) = json.supported_protocol_versions {
            Some(data_frame::Message::SupportedProtocolVersions(wire::SupportedProtocolVersions {
                supported_protocol_versions: m.supported_protocol_versions,
            }))
        } else if let Some(m) = json.init_connection {
            Some(data_frame::Message::InitConnection(wire::InitConnection {
                max_message_size: m.max_message_size,
            }))
        } else if let Some(m) = json.connection_accepted {
            Some(data_frame::Message::ConnectionAccepted(wire::ConnectionAccepted {
                max_message_size: m.max_message_size,
            }))
        } else if let Some(m) = json.publish {
            Some(data_frame::Message::Publish(wire::Publish {
                topic: m.topic,
                delivery_strategy: m.delivery_strategy,
                size: m.size,
                payload: m.payload,
            }))
        } else if let Some(m) = json.subscribe {
            Some(data_frame::Message::Subscribe(wire::Subscribe { topic: m.topic }))
        } else if let Some(m) = json.unsubscribe {
            Some(data_frame::Message::Unsubscribe(wire::Unsubscribe { topic: m.topic }))
        } else if let Some(m) = json.gracefully_close {
            Some(data_frame::Message::GracefullyClose(wire::GracefullyClose { reason: m.reason }))
        } else {
            json.terminate_network
                .map(|m| data_frame::Message::TerminateNetwork(wire::TerminateNetwork { reason: m.reason }))
        };

        wire::DataFrame {
            ttl: json.ttl,
            traversed: json.traversed,
            message,
        }
    }
}

/// 将线上结构编码为 JSON 文本
pub fn to_json(frame: &wire::DataFrame) -> Result<Vec<u8>> {
    serde_json::to_vec(&JsonDataFrame::from(frame)).map_err(Error::from)
}

/// 从 JSON 文本解码线上结构
pub fn from_json(data: &[u8]) -> Result<wire::DataFrame> {
    let json: JsonDataFrame = serde_json::from_slice(data)?;
    Ok(json.into())
}
