/// 全局网络
///
/// 发布路由、订阅同步与网络终止

use tracing::{debug, warn};

use super::engine::NetworkCore;
use super::diagnostics::DiagnosticEvent;
use super::edge::{EdgeId, EdgeState};
use crate::protocol::{
    DataFrame, DeliveryStrategy, Message, PublishMessage, SubscribeMessage,
    TerminateNetworkMessage, UnsubscribeMessage, ONLY_DIRECT_CONNECTION_TTL,
};
use crate::topic::{deduplicate_overlapping_topics, deduplicated_overlapping_topics_diff};
use crate::utils::{has_duplicates, random_order, unique};

/// 参与消息路由的一方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Participant {
    Native,
    Edge(EdgeId),
}

impl NetworkCore {
    // ==================== 发布 ====================

    /// 将发布消息交给所有参与者，最多一次投递时第一个处理者之后停止
    pub(crate) fn published(&mut self, message: PublishMessage) {
        self.emit(DiagnosticEvent::Publication(message.clone()));

        let mut participants = vec![Participant::Native];
        participants.extend(self.edge_ids().into_iter().map(Participant::Edge));

        for participant in random_order(&participants) {
            let handled = match participant {
                Participant::Native => self.native_handle_publish(&message),
                Participant::Edge(id) => self.edge_handle_publish(id, &message),
            };

            if handled && message.delivery_strategy == DeliveryStrategy::AtMostOnce {
                break;
            }
        }
    }

    // ==================== 订阅同步 ====================

    /// 对端应当收到的顶层主题：本地订阅与其他边订阅的并集
    fn desired_topics(&self, id: EdgeId) -> Vec<String> {
        let mut topics = self.native.top_level_topics();
        for edge in self.edges.iter().filter(|edge| edge.id != id) {
            topics.extend(edge.subscribed_topics());
        }
        deduplicate_overlapping_topics(&unique(&topics))
    }

    /// 同步除来源边以外所有已连接边的订阅
    pub(crate) fn synchronize_subscriptions(&mut self, trigger: &DataFrame, origin: Option<EdgeId>) {
        if self.terminating {
            return;
        }
        for id in self.connected_edge_ids() {
            if Some(id) == origin {
                continue;
            }
            self.synchronize_edge(id, trigger);
        }
    }

    /// 先发送新增主题的订阅，再发送被移除主题的取消订阅
    pub(crate) fn synchronize_edge(&mut self, id: EdgeId, trigger: &DataFrame) {
        let Some(edge) = self.edge(id) else {
            return;
        };

        let desired = self.desired_topics(id);
        let diff = deduplicated_overlapping_topics_diff(&edge.info.advertised_topics, &desired);
        if diff.added.is_empty() && diff.removed.is_empty() {
            return;
        }

        debug!(
            "同步边 {} 的订阅: 新增 {:?}, 移除 {:?}",
            id, diff.added, diff.removed
        );

        for topic in diff.added {
            if !self.is_connected(id) {
                return;
            }
            let Some(frame) = self.forward_frame(trigger) else {
                return;
            };
            let message = Message::Subscribe(SubscribeMessage {
                frame,
                topic: topic.clone(),
            });
            if !self.send_subscription_update(id, &message) {
                return;
            }
            if let Some(edge) = self.edge_mut(id) {
                edge.info.advertised_topics.push(topic);
            }
        }

        for topic in diff.removed {
            if !self.is_connected(id) {
                return;
            }
            let Some(frame) = self.forward_frame(trigger) else {
                return;
            };
            let message = Message::Unsubscribe(UnsubscribeMessage {
                frame,
                topic: topic.clone(),
            });
            if !self.send_subscription_update(id, &message) {
                return;
            }
            if let Some(edge) = self.edge_mut(id) {
                edge.info.advertised_topics.retain(|advertised| *advertised != topic);
            }
        }
    }

    fn send_subscription_update(&mut self, id: EdgeId, message: &Message) -> bool {
        match self.send(id, message) {
            Ok(()) => true,
            Err(e) => {
                self.set_state(
                    id,
                    EdgeState::Disconnecting(format!(
                        "Failed to synchronize subscriptions: {}",
                        e
                    )),
                );
                false
            }
        }
    }

    // ==================== 转发与环路 ====================

    /// 经过本节点转发后的帧，出现环路时终止网络，TTL 耗尽时返回 None
    pub(crate) fn forward_frame(&mut self, frame: &DataFrame) -> Option<DataFrame> {
        let forwarded = frame.forwarded(self.host_id());

        if has_duplicates(&forwarded.traversed) {
            self.terminate_on_loop(&forwarded.traversed);
            return None;
        }

        if forwarded.ttl <= 0 {
            return None;
        }

        Some(forwarded)
    }

    pub(crate) fn terminate_on_loop(&mut self, path: &[String]) {
        let reason = format!("Network loop detected: {}", path.join(" -> "));
        warn!("⚠️ [{}] {}", self.host_id(), reason);
        self.terminate_network(&reason);
    }

    // ==================== 网络终止 ====================

    pub(crate) fn terminate_network(&mut self, reason: &str) {
        self.terminated(TerminateNetworkMessage {
            frame: DataFrame::new(ONLY_DIRECT_CONNECTION_TTL, Vec::new()),
            reason: reason.to_string(),
        });
    }

    /// 记录诊断并将终止消息传播到所有边
    pub(crate) fn terminated(&mut self, message: TerminateNetworkMessage) {
        if self.terminating {
            return;
        }

        warn!("[{}] 网络终止: {}", self.host_id(), message.reason);
        self.emit(DiagnosticEvent::NetworkTerminated(message.clone()));

        self.terminating = true;
        for id in self.edge_ids() {
            self.edge_handle_terminate(id, &message);
        }
        self.terminating = false;
    }
}
