/// 边状态机
///
/// Connecting -> Connected -> Disconnecting -> Disconnected，
/// Disconnected 为终态，之后的所有事件都被忽略

mod closing;
mod connected;
mod connecting;

use tracing::debug;

use super::engine::NetworkCore;
use super::edge::{EdgeId, EdgeState};
use crate::protocol::Message;

/// 消息格式错误时的断开原因
pub const MALFORMED_MESSAGE_REASON: &str = "Malformed message received";

impl NetworkCore {
    pub fn set_state(&mut self, id: EdgeId, state: EdgeState) {
        let host_id = self.host_id().to_string();
        let Some(edge) = self.edge_mut(id) else {
            return;
        };

        if edge.is_disconnected() {
            return;
        }

        debug!("[{}] 边 {} 状态切换: {:?} -> {:?}", host_id, id, edge.state, state);
        edge.state = state.clone();

        match state {
            EdgeState::Connecting => self.enter_connecting(id),
            EdgeState::Connected => self.enter_connected(id),
            EdgeState::Disconnecting(reason) => self.enter_disconnecting(id, &reason),
            EdgeState::Disconnected(reason) => self.enter_disconnected(id, &reason),
        }
    }

    pub fn handle_message(&mut self, id: EdgeId, message: Message) {
        let Some(state) = self.edge(id).map(|edge| edge.state.clone()) else {
            return;
        };

        match state {
            EdgeState::Connecting => self.connecting_handle_message(id, message),
            EdgeState::Connected => self.connected_handle_message(id, message),
            EdgeState::Disconnecting(_) | EdgeState::Disconnected(_) => {
                debug!("边 {} 已断开，忽略消息 {}", id, message.kind());
            }
        }
    }
}
