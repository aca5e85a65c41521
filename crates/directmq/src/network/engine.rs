/// 节点核心
///
/// 同步状态机，所有事件都在持有节点锁时处理，
/// 需要执行用户代码的副作用先记录在 effects 中，由外层在释放锁后执行

use std::sync::Arc;
use tracing::{debug, warn};

use super::config::NetworkNodeConfig;
use super::diagnostics::DiagnosticEvent;
use super::edge::{EdgeId, EdgeRole, EdgeSnapshot, EdgeState, NetworkEdge};
use crate::errors::{Error, Result};
use crate::portal::Portal;
use crate::protocol::{DataFrame, Message, Protocol};
use crate::subscription::SubscriptionList;

/// 本地订阅处理器
pub type MessageHandler = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

/// 延迟到锁外执行的副作用
pub(crate) enum Effect {
    Deliver {
        handler: MessageHandler,
        topic: String,
        payload: Vec<u8>,
    },
    Diagnostic(DiagnosticEvent),
}

pub(crate) struct NetworkCore {
    pub config: NetworkNodeConfig,
    protocol: Arc<dyn Protocol>,
    pub native: SubscriptionList<MessageHandler>,
    pub edges: Vec<NetworkEdge>,
    next_edge_id: u64,
    effects: Vec<Effect>,
    /// 正在向所有边传播网络终止
    pub terminating: bool,
}

impl NetworkCore {
    pub fn new(config: NetworkNodeConfig, protocol: Arc<dyn Protocol>) -> Self {
        Self {
            config,
            protocol,
            native: SubscriptionList::new(),
            edges: Vec::new(),
            next_edge_id: 1,
            effects: Vec::new(),
            terminating: false,
        }
    }

    pub fn host_id(&self) -> &str {
        &self.config.host_id
    }

    /// 本地发出的消息使用的初始帧
    pub fn initial_frame(&self) -> DataFrame {
        DataFrame::new(self.config.host_ttl, Vec::new())
    }

    // ==================== 副作用 ====================

    pub fn emit(&mut self, event: DiagnosticEvent) {
        self.effects.push(Effect::Diagnostic(event));
    }

    pub fn deliver(&mut self, handler: MessageHandler, topic: &str, payload: &[u8]) {
        self.effects.push(Effect::Deliver {
            handler,
            topic: topic.to_string(),
            payload: payload.to_vec(),
        });
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    // ==================== 边管理 ====================

    pub fn edge(&self, id: EdgeId) -> Option<&NetworkEdge> {
        self.edges.iter().find(|edge| edge.id == id)
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut NetworkEdge> {
        self.edges.iter_mut().find(|edge| edge.id == id)
    }

    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.edges.iter().map(|edge| edge.id).collect()
    }

    pub fn connected_edge_ids(&self) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|edge| edge.is_connected())
            .map(|edge| edge.id)
            .collect()
    }

    pub fn is_connected(&self, id: EdgeId) -> bool {
        self.edge(id).map(NetworkEdge::is_connected).unwrap_or(false)
    }

    pub fn add_edge(&mut self, portal: Arc<dyn Portal>, role: EdgeRole) -> EdgeId {
        let id = EdgeId(self.next_edge_id);
        self.next_edge_id += 1;

        debug!("添加边 {} ({:?})", id, role);
        self.edges.push(NetworkEdge::new(id, role, portal));
        self.enter_connecting(id);
        id
    }

    /// 移除已断开的边
    pub fn prune_disconnected(&mut self) {
        self.edges.retain(|edge| {
            if edge.is_disconnected() {
                debug!("移除已断开的边 {}", edge.id);
                false
            } else {
                true
            }
        });
    }

    pub fn snapshots(&self) -> Vec<EdgeSnapshot> {
        self.edges.iter().map(NetworkEdge::snapshot).collect()
    }

    // ==================== 收发 ====================

    /// 编码并写入指定边
    pub fn send(&self, id: EdgeId, message: &Message) -> Result<()> {
        let edge = self.edge(id).ok_or(Error::EdgeNotFound(id.0))?;
        let packet = self.protocol.encode(message)?;
        debug!("📤 {} -> {}: {}", self.host_id(), id, message.kind());
        edge.portal.write_packet(packet)
    }

    /// 处理来自指定边的数据包
    pub fn handle_packet(&mut self, id: EdgeId, packet: &[u8]) -> Result<()> {
        if self.edge(id).is_none() {
            return Err(Error::EdgeNotFound(id.0));
        }

        let message = self.protocol.decode(packet);
        debug!("📥 {} <- {}: {}", self.host_id(), id, message.kind());
        self.handle_message(id, message);
        Ok(())
    }

    /// 传输层已关闭
    pub fn portal_closed(&mut self, id: EdgeId, reason: &str) {
        match self.edge(id) {
            Some(edge) if !edge.is_disconnected() => {
                self.set_state(id, EdgeState::Disconnected(reason.to_string()));
            }
            _ => {}
        }
    }

    /// 主动断开指定边
    pub fn remove_edge(&mut self, id: EdgeId, reason: &str) -> bool {
        match self.edge(id).map(|edge| edge.state.clone()) {
            Some(EdgeState::Connecting) | Some(EdgeState::Connected) => {
                self.set_state(id, EdgeState::Disconnecting(reason.to_string()));
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    /// 优雅关闭所有边
    pub fn close(&mut self, reason: &str) {
        for id in self.edge_ids() {
            self.remove_edge(id, reason);
        }
        if !self.edges.iter().all(NetworkEdge::is_disconnected) {
            warn!("关闭节点后仍有未断开的边");
        }
    }
}
