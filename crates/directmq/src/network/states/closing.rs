use tracing::{debug, info, warn};

use crate::network::engine::NetworkCore;
use crate::network::diagnostics::DiagnosticEvent;
use crate::network::edge::{EdgeId, EdgeState};
use crate::protocol::{DataFrame, GracefullyCloseMessage, Message, UnsubscribeMessage};

impl NetworkCore {
    /// 进入 Disconnecting：通知对端原因后立即断开
    pub(crate) fn enter_disconnecting(&mut self, id: EdgeId, reason: &str) {
        let message = Message::GracefullyClose(GracefullyCloseMessage {
            frame: DataFrame::direct(self.host_id()),
            reason: reason.to_string(),
        });

        if let Err(e) = self.send(id, &message) {
            debug!("向边 {} 发送关闭消息失败: {}", id, e);
        }

        self.set_state(id, EdgeState::Disconnected(reason.to_string()));
    }

    /// 进入 Disconnected：关闭传输，撤销对端订阅
    pub(crate) fn enter_disconnected(&mut self, id: EdgeId, reason: &str) {
        let host_ttl = self.config.host_ttl;
        let Some(edge) = self.edge_mut(id) else {
            return;
        };

        if let Err(e) = edge.portal.close() {
            warn!("关闭边 {} 的传输失败: {}", id, e);
        }

        let previous = std::mem::take(&mut edge.info);
        let bridged_node_id = previous.bridged_node_id;
        let revoked = previous.bridged_node_subscriptions.top_level_topics();

        info!("🔌 [{}] 与节点 {} 断开连接: {}", self.host_id(), bridged_node_id, reason);
        self.emit(DiagnosticEvent::ConnectionLost {
            bridged_node_id: bridged_node_id.clone(),
            reason: reason.to_string(),
            edge: id,
        });

        if revoked.is_empty() {
            return;
        }

        let revoke_frame = DataFrame::new(host_ttl, vec![bridged_node_id]);
        for topic in revoked {
            self.emit(DiagnosticEvent::Unsubscription(UnsubscribeMessage {
                frame: revoke_frame.clone(),
                topic,
            }));
        }

        let initial = self.initial_frame();
        self.synchronize_subscriptions(&initial, Some(id));
    }
}
