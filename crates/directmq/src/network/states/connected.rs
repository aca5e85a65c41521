use tracing::{debug, info, warn};

use super::MALFORMED_MESSAGE_REASON;
use crate::network::engine::NetworkCore;
use crate::network::diagnostics::DiagnosticEvent;
use crate::network::edge::{EdgeId, EdgeState};
use crate::protocol::{
    DataFrame, Message, PublishMessage, SubscribeMessage, TerminateNetworkMessage,
    UnsubscribeMessage, NO_MAX_MESSAGE_SIZE, ONLY_DIRECT_CONNECTION_TTL,
};
use crate::utils::has_duplicates;

impl NetworkCore {
    /// 进入 Connected：通知诊断并向对端同步订阅
    pub(crate) fn enter_connected(&mut self, id: EdgeId) {
        let Some(edge) = self.edge(id) else {
            return;
        };
        let bridged_node_id = edge.info.bridged_node_id.clone();

        info!("✅ [{}] 与节点 {} 建立连接 ({})", self.host_id(), bridged_node_id, id);
        self.emit(DiagnosticEvent::ConnectionEstablished {
            bridged_node_id,
            edge: id,
        });

        let initial = self.initial_frame();
        self.synchronize_edge(id, &initial);
    }

    pub(crate) fn connected_handle_message(&mut self, id: EdgeId, message: Message) {
        match message {
            Message::Publish(message) => {
                if self.detect_incoming_loop(&message.frame) {
                    return;
                }
                self.published(message);
            }
            Message::Subscribe(message) => {
                if self.detect_incoming_loop(&message.frame) {
                    return;
                }
                self.handle_bridged_subscribe(id, message);
            }
            Message::Unsubscribe(message) => {
                if self.detect_incoming_loop(&message.frame) {
                    return;
                }
                self.handle_bridged_unsubscribe(id, message);
            }
            Message::GracefullyClose(message) => {
                self.set_state(id, EdgeState::Disconnected(message.reason));
            }
            Message::TerminateNetwork(message) => {
                self.set_state(id, EdgeState::Disconnected(message.reason.clone()));
                self.terminated(message);
            }
            Message::SupportedProtocolVersions(_)
            | Message::InitConnection(_)
            | Message::ConnectionAccepted(_) => {
                warn!("边 {} 已连接但收到握手消息 {}", id, message.kind());
                self.set_state(id, EdgeState::Disconnecting("Unexpected handshake message".to_string()));
            }
            Message::Malformed(_) => {
                self.set_state(id, EdgeState::Disconnecting(MALFORMED_MESSAGE_REASON.to_string()));
            }
        }
    }

    /// 收到的消息已经经过本节点时终止网络
    fn detect_incoming_loop(&mut self, frame: &DataFrame) -> bool {
        let host_id = self.host_id().to_string();
        if !frame.traversed.contains(&host_id) && !has_duplicates(&frame.traversed) {
            return false;
        }

        let mut path = frame.traversed.clone();
        path.push(host_id);
        self.terminate_on_loop(&path);
        true
    }

    fn handle_bridged_subscribe(&mut self, id: EdgeId, message: SubscribeMessage) {
        let Some(edge) = self.edge_mut(id) else {
            return;
        };

        if let Err(e) = edge.info.bridged_node_subscriptions.add(message.topic.clone(), ()) {
            warn!("记录对端订阅失败: {}", e);
            return;
        }

        debug!("边 {} 订阅主题 {}", id, message.topic);
        let trigger = message.frame.clone();
        self.emit(DiagnosticEvent::Subscription(message));
        self.synchronize_subscriptions(&trigger, Some(id));
    }

    fn handle_bridged_unsubscribe(&mut self, id: EdgeId, message: UnsubscribeMessage) {
        let Some(edge) = self.edge_mut(id) else {
            return;
        };

        let subscriptions = &mut edge.info.bridged_node_subscriptions;
        let Some(subscription_id) = subscriptions.find_by_topic(&message.topic).map(|s| s.id) else {
            debug!("边 {} 取消未订阅的主题 {}", id, message.topic);
            return;
        };
        subscriptions.remove(subscription_id);

        debug!("边 {} 取消订阅主题 {}", id, message.topic);
        let trigger = message.frame.clone();
        self.emit(DiagnosticEvent::Unsubscription(message));
        self.synchronize_subscriptions(&trigger, Some(id));
    }

    /// 向对端转发发布消息，返回是否已交给传输层
    pub(crate) fn edge_handle_publish(&mut self, id: EdgeId, message: &PublishMessage) -> bool {
        let Some(edge) = self.edge(id) else {
            return false;
        };

        if !edge.is_connected() || edge.is_origin_of(&message.frame) {
            return false;
        }

        if !edge.info.bridged_node_subscriptions.will_handle_topic(&message.topic) {
            return false;
        }

        let max_size = edge.info.bridged_node_max_message_size;
        if max_size != NO_MAX_MESSAGE_SIZE && message.payload.len() as u64 > max_size {
            debug!(
                "消息超出节点 {} 的大小限制 ({} > {})",
                edge.info.bridged_node_id,
                message.payload.len(),
                max_size
            );
            return false;
        }

        let Some(frame) = self.forward_frame(&message.frame) else {
            return false;
        };

        let forwarded = Message::Publish(PublishMessage {
            frame,
            topic: message.topic.clone(),
            delivery_strategy: message.delivery_strategy,
            payload: message.payload.clone(),
        });

        match self.send(id, &forwarded) {
            Ok(()) => true,
            Err(e) => {
                self.set_state(id, EdgeState::Disconnecting(format!("Failed to publish message: {}", e)));
                false
            }
        }
    }

    /// 向对端传播网络终止
    pub(crate) fn edge_handle_terminate(&mut self, id: EdgeId, message: &TerminateNetworkMessage) {
        let Some(state) = self.edge(id).map(|edge| edge.state.clone()) else {
            return;
        };

        match state {
            EdgeState::Connecting => {
                self.set_state(
                    id,
                    EdgeState::Disconnecting(format!("Network terminated: {}", message.reason)),
                );
            }
            EdgeState::Connected => {
                let mut traversed = message.frame.traversed.clone();
                traversed.push(self.host_id().to_string());

                let terminate = Message::TerminateNetwork(TerminateNetworkMessage {
                    frame: DataFrame::new(ONLY_DIRECT_CONNECTION_TTL, traversed),
                    reason: message.reason.clone(),
                });
                if let Err(e) = self.send(id, &terminate) {
                    warn!("向边 {} 发送网络终止消息失败: {}", id, e);
                }
                self.set_state(id, EdgeState::Disconnected(message.reason.clone()));
            }
            EdgeState::Disconnecting(_) | EdgeState::Disconnected(_) => {}
        }
    }
}
