/// DirectMQ SDK
///
/// 去中心化发布 / 订阅网络：节点之间通过传输连接，
/// 订阅沿连接传播，发布按订阅路由并受 TTL 与消息大小限制

pub mod errors;
pub mod network;
pub mod portal;
pub mod portals;
pub mod protocol;
pub mod subscription;
pub mod topic;
pub mod utils;

// 重新导出常用类型
pub use errors::{Error, Result};
pub use network::{EdgeId, NetworkNode, NetworkNodeConfig};
pub use portal::Portal;
pub use portals::MessagesType;
pub use protocol::{DeliveryStrategy, ProtobufFormat, ProtobufProtocol, Protocol};
pub use subscription::SubscriptionId;
