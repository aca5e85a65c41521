/// 标准输出通知
///
/// 每行一个 JSON 对象，只设置一个字段

use directmq::protocol::{PublishMessage, SubscribeMessage, TerminateNetworkMessage, UnsubscribeMessage};
use directmq::SubscriptionId;
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    // Agent API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready: Option<ReadyNotification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal: Option<FatalNotification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_received: Option<MessageReceivedNotification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribed: Option<SubscribedNotification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped: Option<StoppedNotification>,

    // 诊断 API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_established: Option<ConnectionEstablishedNotification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_lost: Option<ConnectionLostNotification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_publication: Option<OnPublicationNotification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_subscription: Option<OnSubscriptionNotification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_unsubscribe: Option<OnUnsubscribeNotification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_network_termination: Option<OnNetworkTerminationNotification>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyNotification {
    pub time: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FatalNotification {
    pub err: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReceivedNotification {
    pub topic: String,
    #[serde(with = "base64_bytes")]
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribedNotification {
    pub subscription_id: SubscriptionId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppedNotification {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEstablishedNotification {
    pub bridged_node_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionLostNotification {
    pub bridged_node_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnPublicationNotification {
    pub ttl: i32,
    pub traversed: Vec<String>,
    pub topic: String,
    pub delivery_strategy: u8,
    #[serde(with = "base64_bytes")]
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnSubscriptionNotification {
    pub ttl: i32,
    pub traversed: Vec<String>,
    pub topic: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnUnsubscribeNotification {
    pub ttl: i32,
    pub traversed: Vec<String>,
    pub topic: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnNetworkTerminationNotification {
    pub ttl: i32,
    pub traversed: Vec<String>,
    pub reason: String,
}

impl Notification {
    pub fn ready(time: impl Into<String>) -> Self {
        Self {
            ready: Some(ReadyNotification { time: time.into() }),
            ..Default::default()
        }
    }

    pub fn fatal(err: impl Into<String>) -> Self {
        Self {
            fatal: Some(FatalNotification { err: err.into() }),
            ..Default::default()
        }
    }

    pub fn message_received(topic: &str, payload: &[u8]) -> Self {
        Self {
            message_received: Some(MessageReceivedNotification {
                topic: topic.to_string(),
                payload: payload.to_vec(),
            }),
            ..Default::default()
        }
    }

    pub fn subscribed(subscription_id: SubscriptionId) -> Self {
        Self {
            subscribed: Some(SubscribedNotification { subscription_id }),
            ..Default::default()
        }
    }

    pub fn stopped(reason: impl Into<String>) -> Self {
        Self {
            stopped: Some(StoppedNotification { reason: reason.into() }),
            ..Default::default()
        }
    }

    pub fn connection_established(bridged_node_id: &str) -> Self {
        Self {
            connection_established: Some(ConnectionEstablishedNotification {
                bridged_node_id: bridged_node_id.to_string(),
            }),
            ..Default::default()
        }
    }

    pub fn connection_lost(bridged_node_id: &str, reason: &str) -> Self {
        Self {
            connection_lost: Some(ConnectionLostNotification {
                bridged_node_id: bridged_node_id.to_string(),
                reason: reason.to_string(),
            }),
            ..Default::default()
        }
    }

    pub fn on_publication(message: &PublishMessage) -> Self {
        Self {
            on_publication: Some(OnPublicationNotification {
                ttl: message.frame.ttl,
                traversed: message.frame.traversed.clone(),
                topic: message.topic.clone(),
                delivery_strategy: message.delivery_strategy.as_u8(),
                payload: message.payload.clone(),
            }),
            ..Default::default()
        }
    }

    pub fn on_subscription(message: &SubscribeMessage) -> Self {
        Self {
            on_subscription: Some(OnSubscriptionNotification {
                ttl: message.frame.ttl,
                traversed: message.frame.traversed.clone(),
                topic: message.topic.clone(),
            }),
            ..Default::default()
        }
    }

    pub fn on_unsubscribe(message: &UnsubscribeMessage) -> Self {
        Self {
            on_unsubscribe: Some(OnUnsubscribeNotification {
                ttl: message.frame.ttl,
                traversed: message.frame.traversed.clone(),
                topic: message.topic.clone(),
            }),
            ..Default::default()
        }
    }

    pub fn on_network_termination(message: &TerminateNetworkMessage) -> Self {
        Self {
            on_network_termination: Some(OnNetworkTerminationNotification {
                ttl: message.frame.ttl,
                traversed: message.frame.traversed.clone(),
                reason: message.reason.clone(),
            }),
            ..Default::default()
        }
    }

    /// 序列化为一行 JSON，不含换行符
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// bytes 字段以 base64 字符串传输
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
