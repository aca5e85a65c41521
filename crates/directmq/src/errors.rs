use thiserror::Error;

/// 统一错误类型
#[derive(Error, Debug)]
pub enum Error {
    #[error("无效主题: {0}")]
    InvalidTopic(String),

    #[error("无效主题模式: {0}")]
    InvalidTopicPattern(String),

    #[error("无效参数: {0}")]
    InvalidArgument(String),

    #[error("协议错误: {0}")]
    Protocol(String),

    #[error("传输错误: {0}")]
    Portal(String),

    #[error("连接已关闭")]
    PortalClosed,

    #[error("边不存在: {0}")]
    EdgeNotFound(u64),

    #[error("无法生成唯一订阅 ID（已尝试 {0} 次）")]
    SubscriptionIdExhausted(usize),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("反序列化错误: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 统一结果类型
pub type Result<T> = std::result::Result<T, Error>;
