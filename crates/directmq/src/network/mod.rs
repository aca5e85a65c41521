/// DirectMQ 网络
///
/// 节点、边状态机、订阅同步、本地 API 与诊断 API

pub mod config;
pub mod diagnostics;
pub mod edge;

mod engine;
mod global;
mod native;
mod node;
mod states;

#[cfg(test)]
mod tests;

pub use self::config::NetworkNodeConfig;
pub use self::engine::MessageHandler;
pub use self::diagnostics::{DiagnosticEvent, Diagnostics};
pub use self::edge::{EdgeId, EdgeRole, EdgeSnapshot, EdgeState};
pub use self::node::NetworkNode;
pub use self::states::MALFORMED_MESSAGE_REASON;
