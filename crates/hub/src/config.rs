/// 配置管理

use directmq::protocol::{DEFAULT_TTL, NO_MAX_MESSAGE_SIZE};
use directmq::{MessagesType, NetworkNodeConfig, ProtobufFormat};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub node_id: String,
    pub ttl: i32,
    pub max_message_size: u64,
    pub ws_path: String,
    pub protocol: ProtobufFormat,
    pub messages_type: MessagesType,
    pub upstreams: Vec<String>,
    pub reconnect_interval: u64,
    pub log_level: String,
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> anyhow::Result<Self> {
        let port = std::env::var("HUB_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()?;

        let node_id = std::env::var("HUB_NODE_ID")
            .unwrap_or_else(|_| uuid::Uuid::new_v4().to_string());

        let ttl = match std::env::var("HUB_TTL") {
            Ok(value) => value.parse()?,
            Err(_) => DEFAULT_TTL,
        };

        let max_message_size = match std::env::var("HUB_MAX_MESSAGE_SIZE") {
            Ok(value) => value.parse()?,
            Err(_) => NO_MAX_MESSAGE_SIZE,
        };

        let ws_path = normalize_path(
            &std::env::var("HUB_WS_PATH").unwrap_or_else(|_| "/directmq".to_string()),
        );

        let protocol = std::env::var("HUB_PROTOCOL")
            .unwrap_or_else(|_| "binary".to_string())
            .parse()?;

        let messages_type = std::env::var("HUB_MESSAGES_TYPE")
            .unwrap_or_else(|_| "binary".to_string())
            .parse()?;

        let upstreams = parse_upstreams(&std::env::var("HUB_UPSTREAMS").unwrap_or_default());

        let reconnect_interval = parse_reconnect_interval(
            &std::env::var("HUB_RECONNECT_INTERVAL").unwrap_or_else(|_| "5".to_string()),
        )?;

        let log_level = std::env::var("LOG_LEVEL")
            .unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            port,
            node_id,
            ttl,
            max_message_size,
            ws_path,
            protocol,
            messages_type,
            upstreams,
            reconnect_interval,
            log_level,
        })
    }

    pub fn node_config(&self) -> NetworkNodeConfig {
        NetworkNodeConfig::new(self.node_id.clone())
            .with_ttl(self.ttl)
            .with_max_incoming_message_size(self.max_message_size)
    }
}

/// 逗号分隔的上游地址，忽略空项
fn parse_upstreams(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

/// 重连间隔（秒），至少为 1
fn parse_reconnect_interval(value: &str) -> anyhow::Result<u64> {
    let interval: u64 = value.trim().parse()?;
    if interval == 0 {
        anyhow::bail!("HUB_RECONNECT_INTERVAL must be at least 1 second");
    }
    Ok(interval)
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_upstreams() {
        assert!(parse_upstreams("").is_empty());
        assert_eq!(
            parse_upstreams("ws://a:1/directmq, ws://b:2/directmq,,"),
            vec!["ws://a:1/directmq", "ws://b:2/directmq"]
        );
    }

    #[test]
    fn test_parse_reconnect_interval() {
        assert_eq!(parse_reconnect_interval("5").unwrap(), 5);
        assert_eq!(parse_reconnect_interval(" 1 ").unwrap(), 1);
        assert!(parse_reconnect_interval("0").is_err());
        assert!(parse_reconnect_interval("soon").is_err());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("directmq"), "/directmq");
        assert_eq!(normalize_path("/mesh"), "/mesh");
    }
}
