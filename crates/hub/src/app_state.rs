/// 应用全局状态

use directmq::NetworkNode;

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    /// Hub 自身的 DirectMQ 节点
    pub node: NetworkNode,
}

impl AppState {
    pub fn new(node: NetworkNode) -> Self {
        Self { node }
    }

    /// 获取节点句柄（克隆）
    pub fn node(&self) -> NetworkNode {
        self.node.clone()
    }
}
