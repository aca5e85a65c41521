/// 诊断 API
///
/// 节点内部事件以回调形式暴露，回调在节点锁释放后执行

use parking_lot::RwLock;
use std::sync::Arc;

use super::edge::EdgeId;
use crate::protocol::{PublishMessage, SubscribeMessage, TerminateNetworkMessage, UnsubscribeMessage};

/// 诊断事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    ConnectionEstablished {
        bridged_node_id: String,
        edge: EdgeId,
    },
    ConnectionLost {
        bridged_node_id: String,
        reason: String,
        edge: EdgeId,
    },
    Publication(PublishMessage),
    Subscription(SubscribeMessage),
    Unsubscription(UnsubscribeMessage),
    NetworkTerminated(TerminateNetworkMessage),
}

pub type ConnectionEstablishedHandler = Arc<dyn Fn(&str, EdgeId) + Send + Sync>;
pub type ConnectionLostHandler = Arc<dyn Fn(&str, &str, EdgeId) + Send + Sync>;
pub type PublicationHandler = Arc<dyn Fn(&PublishMessage) + Send + Sync>;
pub type SubscriptionHandler = Arc<dyn Fn(&SubscribeMessage) + Send + Sync>;
pub type UnsubscriptionHandler = Arc<dyn Fn(&UnsubscribeMessage) + Send + Sync>;
pub type NetworkTerminatedHandler = Arc<dyn Fn(&TerminateNetworkMessage) + Send + Sync>;
pub type EventHandler = Arc<dyn Fn(&DiagnosticEvent) + Send + Sync>;

#[derive(Default, Clone)]
struct Handlers {
    connection_established: Vec<ConnectionEstablishedHandler>,
    connection_lost: Vec<ConnectionLostHandler>,
    publication: Vec<PublicationHandler>,
    subscription: Vec<SubscriptionHandler>,
    unsubscription: Vec<UnsubscriptionHandler>,
    network_terminated: Vec<NetworkTerminatedHandler>,
    any: Vec<EventHandler>,
}

/// 诊断回调注册表
#[derive(Default)]
pub struct Diagnostics {
    handlers: RwLock<Handlers>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connection_established(&self, handler: ConnectionEstablishedHandler) {
        self.handlers.write().connection_established.push(handler);
    }

    pub fn on_connection_lost(&self, handler: ConnectionLostHandler) {
        self.handlers.write().connection_lost.push(handler);
    }

    pub fn on_publication(&self, handler: PublicationHandler) {
        self.handlers.write().publication.push(handler);
    }

    pub fn on_subscription(&self, handler: SubscriptionHandler) {
        self.handlers.write().subscription.push(handler);
    }

    pub fn on_unsubscription(&self, handler: UnsubscriptionHandler) {
        self.handlers.write().unsubscription.push(handler);
    }

    pub fn on_network_terminated(&self, handler: NetworkTerminatedHandler) {
        self.handlers.write().network_terminated.push(handler);
    }

    /// 接收所有诊断事件
    pub fn on_event(&self, handler: EventHandler) {
        self.handlers.write().any.push(handler);
    }

    /// 调用事件对应的回调
    pub fn dispatch(&self, event: &DiagnosticEvent) {
        // 先复制回调列表，回调中可以继续注册新的回调
        let handlers = self.handlers.read().clone();

        match event {
            DiagnosticEvent::ConnectionEstablished { bridged_node_id, edge } => {
                for handler in &handlers.connection_established {
                    handler(bridged_node_id, *edge);
                }
            }
            DiagnosticEvent::ConnectionLost {
                bridged_node_id,
                reason,
                edge,
            } => {
                for handler in &handlers.connection_lost {
                    handler(bridged_node_id, reason, *edge);
                }
            }
            DiagnosticEvent::Publication(message) => {
                for handler in &handlers.publication {
                    handler(message);
                }
            }
            DiagnosticEvent::Subscription(message) => {
                for handler in &handlers.subscription {
                    handler(message);
                }
            }
            DiagnosticEvent::Unsubscription(message) => {
                for handler in &handlers.unsubscription {
                    handler(message);
                }
            }
            DiagnosticEvent::NetworkTerminated(message) => {
                for handler in &handlers.network_terminated {
                    handler(message);
                }
            }
        }

        for handler in &handlers.any {
            handler(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::DataFrame;
    use parking_lot::Mutex;

    #[test]
    fn test_dispatch_to_typed_and_generic_handlers() {
        let diagnostics = Diagnostics::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let typed = seen.clone();
        diagnostics.on_subscription(Arc::new(move |message: &SubscribeMessage| {
            typed.lock().push(format!("subscription:{}", message.topic));
        }));
        let generic = seen.clone();
        diagnostics.on_event(Arc::new(move |_event: &DiagnosticEvent| {
            generic.lock().push("event".to_string());
        }));
        let lost = seen.clone();
        diagnostics.on_connection_lost(Arc::new(move |id: &str, reason: &str, _edge: EdgeId| {
            lost.lock().push(format!("lost:{}:{}", id, reason));
        }));

        diagnostics.dispatch(&DiagnosticEvent::Subscription(SubscribeMessage {
            frame: DataFrame::default(),
            topic: "a/b".to_string(),
        }));
        diagnostics.dispatch(&DiagnosticEvent::ConnectionLost {
            bridged_node_id: "peer".to_string(),
            reason: "bye".to_string(),
            edge: EdgeId(1),
        });

        let seen = seen.lock();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], "subscription:a/b");
        assert_eq!(seen[1], "event");
        assert_eq!(seen[2], "lost:peer:bye");
        assert_eq!(seen[3], "event");
    }
}
