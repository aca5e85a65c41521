/// 标准输入命令
///
/// 每行一个 JSON 对象，字段均可选，按声明顺序处理

use directmq::SubscriptionId;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    // 连接 API
    pub setup: Option<SetupCommand>,
    pub listen: Option<ListenCommand>,
    pub connect: Option<ConnectCommand>,
    pub stop: Option<StopCommand>,

    // 本地 API
    pub publish: Option<PublishCommand>,
    pub subscribe_topic: Option<SubscribeTopicCommand>,
    pub unsubscribe_topic: Option<UnsubscribeTopicCommand>,
}

impl Command {
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SetupCommand {
    pub ttl: i32,
    pub node_id: String,
    pub max_message_size: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenCommand {
    pub address: String,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectCommand {
    pub address: String,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StopCommand {
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishCommand {
    pub topic: String,
    #[serde(default)]
    pub delivery_strategy: u8,
    #[serde(with = "crate::notifications::base64_bytes")]
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeTopicCommand {
    pub topic: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeTopicCommand {
    pub subscription_id: SubscriptionId,
}
