/// 本地 API
///
/// 本节点上的发布与订阅，本地订阅者同样会收到本节点发布的消息

use tracing::debug;

use super::engine::{MessageHandler, NetworkCore};
use super::diagnostics::DiagnosticEvent;
use crate::errors::{Error, Result};
use crate::protocol::{DeliveryStrategy, PublishMessage, SubscribeMessage, UnsubscribeMessage};
use crate::subscription::SubscriptionId;
use crate::topic::{deduplicated_overlapping_topics_diff, is_correct_topic, is_correct_topic_pattern};
use crate::utils::random_order;

impl NetworkCore {
    pub(crate) fn native_publish(
        &mut self,
        topic: &str,
        payload: Vec<u8>,
        delivery_strategy: DeliveryStrategy,
    ) -> Result<()> {
        if !is_correct_topic(topic) {
            return Err(Error::InvalidTopic(topic.to_string()));
        }
        if payload.is_empty() {
            return Err(Error::InvalidArgument("消息负载不能为空".to_string()));
        }

        let message = PublishMessage {
            frame: self.initial_frame(),
            topic: topic.to_string(),
            delivery_strategy,
            payload,
        };
        self.published(message);
        Ok(())
    }

    pub(crate) fn native_subscribe(&mut self, pattern: &str, handler: MessageHandler) -> Result<SubscriptionId> {
        if !is_correct_topic_pattern(pattern) {
            return Err(Error::InvalidTopicPattern(pattern.to_string()));
        }

        let before = self.native.top_level_topics();
        let id = self.native.add(pattern, handler)?;
        debug!("[{}] 本地订阅 {} ({})", self.host_id(), pattern, id);

        self.native_topics_changed(before);
        Ok(id)
    }

    pub(crate) fn native_unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.native.top_level_topics();
        if !self.native.remove(id) {
            return false;
        }
        debug!("[{}] 取消本地订阅 {}", self.host_id(), id);

        self.native_topics_changed(before);
        true
    }

    /// 顶层主题变化时通知诊断并同步到所有边
    fn native_topics_changed(&mut self, before: Vec<String>) {
        let after = self.native.top_level_topics();
        let diff = deduplicated_overlapping_topics_diff(&before, &after);
        if diff.added.is_empty() && diff.removed.is_empty() {
            return;
        }

        let frame = self.initial_frame();
        for topic in diff.added {
            self.emit(DiagnosticEvent::Subscription(SubscribeMessage {
                frame: frame.clone(),
                topic,
            }));
        }
        for topic in diff.removed {
            self.emit(DiagnosticEvent::Unsubscription(UnsubscribeMessage {
                frame: frame.clone(),
                topic,
            }));
        }

        self.synchronize_subscriptions(&frame, None);
    }

    /// 投递给匹配的本地订阅者，返回是否有订阅者处理
    pub(crate) fn native_handle_publish(&mut self, message: &PublishMessage) -> bool {
        let handlers: Vec<MessageHandler> = self
            .native
            .triggered(&message.topic)
            .into_iter()
            .map(|subscription| subscription.handler.clone())
            .collect();

        if handlers.is_empty() {
            return false;
        }

        let mut handlers = random_order(&handlers);
        if message.delivery_strategy == DeliveryStrategy::AtMostOnce {
            handlers.truncate(1);
        }

        for handler in handlers {
            self.deliver(handler, &message.topic, &message.payload);
        }
        true
    }
}
