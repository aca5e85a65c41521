/// 网络节点
///
/// 线程安全的节点句柄，可以被传输层任务和业务代码同时持有

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

use super::config::NetworkNodeConfig;
use super::engine::{Effect, MessageHandler, NetworkCore};
use super::diagnostics::Diagnostics;
use super::edge::{EdgeId, EdgeRole, EdgeSnapshot};
use crate::errors::{Error, Result};
use crate::portal::Portal;
use crate::protocol::{
    DeliveryStrategy, Protocol, PublishMessage, SubscribeMessage, TerminateNetworkMessage,
    UnsubscribeMessage,
};
use crate::subscription::SubscriptionId;

#[derive(Clone)]
pub struct NetworkNode {
    core: Arc<Mutex<NetworkCore>>,
    diagnostics: Arc<Diagnostics>,
    config: NetworkNodeConfig,
}

impl NetworkNode {
    /// 创建新的网络节点
    pub fn new(config: NetworkNodeConfig, protocol: Arc<dyn Protocol>) -> Result<Self> {
        config.validate()?;
        info!("🚀 创建 DirectMQ 节点: {}", config.host_id);

        Ok(Self {
            core: Arc::new(Mutex::new(NetworkCore::new(config.clone(), protocol))),
            diagnostics: Arc::new(Diagnostics::new()),
            config,
        })
    }

    pub fn config(&self) -> &NetworkNodeConfig {
        &self.config
    }

    pub fn host_id(&self) -> &str {
        &self.config.host_id
    }

    /// 在节点锁内执行操作，释放锁后再执行回调
    fn with_core<R>(&self, operation: impl FnOnce(&mut NetworkCore) -> R) -> R {
        let (result, effects) = {
            let mut core = self.core.lock();
            let result = operation(&mut core);
            core.prune_disconnected();
            (result, core.take_effects())
        };

        self.dispatch(effects);
        result
    }

    fn dispatch(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Deliver {
                    handler,
                    topic,
                    payload,
                } => handler(&topic, &payload),
                Effect::Diagnostic(event) => self.diagnostics.dispatch(&event),
            }
        }
    }

    // ==================== 边管理 ====================

    /// 添加被动接受的连接，等待对端发起握手
    pub fn add_listening_edge(&self, portal: Arc<dyn Portal>) -> EdgeId {
        self.with_core(|core| core.add_edge(portal, EdgeRole::Listening))
    }

    /// 添加主动发起的连接，立即开始握手
    pub fn add_connecting_edge(&self, portal: Arc<dyn Portal>) -> EdgeId {
        self.with_core(|core| core.add_edge(portal, EdgeRole::Connecting))
    }

    /// 处理传输层收到的数据包
    pub fn handle_packet(&self, edge: EdgeId, packet: &[u8]) -> Result<()> {
        self.with_core(|core| core.handle_packet(edge, packet))
    }

    /// 传输层读取端结束
    pub fn portal_closed(&self, edge: EdgeId, reason: &str) {
        self.with_core(|core| core.portal_closed(edge, reason))
    }

    /// 优雅断开指定边，边不存在时返回 false
    pub fn remove_edge(&self, edge: EdgeId, reason: &str) -> bool {
        self.with_core(|core| core.remove_edge(edge, reason))
    }

    /// 优雅断开所有边
    pub fn close(&self, reason: &str) {
        info!("关闭节点 {}: {}", self.host_id(), reason);
        self.with_core(|core| core.close(reason))
    }

    /// 终止整个网络
    pub fn terminate_network(&self, reason: &str) {
        self.with_core(|core| core.terminate_network(reason))
    }

    pub fn edges(&self) -> Vec<EdgeSnapshot> {
        self.core.lock().snapshots()
    }

    /// 已连接的对端节点 ID
    pub fn bridged_node_ids(&self) -> Vec<String> {
        self.edges()
            .into_iter()
            .filter(|edge| edge.state == "connected")
            .filter_map(|edge| edge.bridged_node_id)
            .collect()
    }

    // ==================== 本地 API ====================

    /// 发布消息，主题不能包含通配符，负载不能为空
    pub fn publish(
        &self,
        topic: &str,
        payload: impl Into<Vec<u8>>,
        delivery_strategy: DeliveryStrategy,
    ) -> Result<()> {
        let payload = payload.into();
        self.with_core(|core| core.native_publish(topic, payload, delivery_strategy))
    }

    /// 订阅主题模式
    pub fn subscribe<F>(&self, pattern: &str, handler: F) -> Result<SubscriptionId>
    where
        F: Fn(&str, &[u8]) + Send + Sync + 'static,
    {
        let handler: MessageHandler = Arc::new(handler);
        self.with_core(|core| core.native_subscribe(pattern, handler))
    }

    /// 取消订阅
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        if self.with_core(|core| core.native_unsubscribe(id)) {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!("订阅不存在: {}", id)))
        }
    }

    /// 本地订阅的顶层主题
    pub fn subscribed_topics(&self) -> Vec<String> {
        self.core.lock().native.top_level_topics()
    }

    // ==================== 诊断 API ====================

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn on_connection_established<F>(&self, handler: F)
    where
        F: Fn(&str, EdgeId) + Send + Sync + 'static,
    {
        self.diagnostics.on_connection_established(Arc::new(handler));
    }

    pub fn on_connection_lost<F>(&self, handler: F)
    where
        F: Fn(&str, &str, EdgeId) + Send + Sync + 'static,
    {
        self.diagnostics.on_connection_lost(Arc::new(handler));
    }

    pub fn on_publication<F>(&self, handler: F)
    where
        F: Fn(&PublishMessage) + Send + Sync + 'static,
    {
        self.diagnostics.on_publication(Arc::new(handler));
    }

    pub fn on_subscription<F>(&self, handler: F)
    where
        F: Fn(&SubscribeMessage) + Send + Sync + 'static,
    {
        self.diagnostics.on_subscription(Arc::new(handler));
    }

    pub fn on_unsubscription<F>(&self, handler: F)
    where
        F: Fn(&UnsubscribeMessage) + Send + Sync + 'static,
    {
        self.diagnostics.on_unsubscription(Arc::new(handler));
    }

    pub fn on_network_terminated<F>(&self, handler: F)
    where
        F: Fn(&TerminateNetworkMessage) + Send + Sync + 'static,
    {
        self.diagnostics.on_network_terminated(Arc::new(handler));
    }
}
