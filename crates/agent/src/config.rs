/// 配置管理

use directmq::{MessagesType, ProtobufFormat};

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub protocol: ProtobufFormat,
    pub messages_type: MessagesType,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            protocol: ProtobufFormat::Json,
            messages_type: MessagesType::Text,
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let log_level = std::env::var("AGENT_LOG_LEVEL")
            .unwrap_or(defaults.log_level);

        let protocol = match std::env::var("AGENT_PROTOCOL") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.protocol,
        };

        let messages_type = match std::env::var("AGENT_MESSAGES_TYPE") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.messages_type,
        };

        Ok(Self {
            log_level,
            protocol,
            messages_type,
        })
    }
}
