/// 上游连接
///
/// 主动连接配置的上游节点，连接断开后按间隔重连，直到 Hub 关闭

use directmq::{portals, EdgeId, MessagesType, NetworkNode};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// 等待一段时间，返回 false 表示 Hub 正在关闭
async fn pause(interval: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(interval) => true,
    }
}

fn has_edge(node: &NetworkNode, edge: EdgeId) -> bool {
    node.edges().iter().any(|snapshot| snapshot.id == edge)
}

pub async fn maintain_upstream(
    url: String,
    messages_type: MessagesType,
    node: NetworkNode,
    interval: Duration,
    shutdown: CancellationToken,
) {
    loop {
        match portals::connect(&url, messages_type, node.clone()).await {
            Ok(edge) => {
                info!("✅ 已连接上游 {} ({})", url, edge);
                while has_edge(&node, edge) {
                    if !pause(interval, &shutdown).await {
                        return;
                    }
                }
                warn!("与上游 {} 的连接已断开", url);
            }
            Err(e) => {
                error!("连接上游 {} 失败: {}", url, e);
            }
        }

        warn!("{}秒后重新连接...", interval.as_secs());
        if !pause(interval, &shutdown).await {
            return;
        }
    }
}
