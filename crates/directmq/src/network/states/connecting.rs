use tracing::{debug, warn};

use super::MALFORMED_MESSAGE_REASON;
use crate::network::engine::NetworkCore;
use crate::network::edge::{EdgeId, EdgeRole, EdgeState};
use crate::protocol::{
    ConnectionAcceptedMessage, DataFrame, InitConnectionMessage, Message,
    SupportedProtocolVersionsMessage, ONLY_DIRECT_CONNECTION_WITH_RESPONSE_TTL, PROTOCOL_VERSION,
    UNKNOWN_PROTOCOL_VERSION,
};

impl NetworkCore {
    /// 进入 Connecting：主动连接的一端发起协议版本协商
    pub(crate) fn enter_connecting(&mut self, id: EdgeId) {
        let Some(edge) = self.edge(id) else {
            return;
        };
        if edge.role != EdgeRole::Connecting {
            return;
        }

        let message = Message::SupportedProtocolVersions(SupportedProtocolVersionsMessage {
            frame: DataFrame::new(
                ONLY_DIRECT_CONNECTION_WITH_RESPONSE_TTL,
                vec![self.host_id().to_string()],
            ),
            supported_protocol_versions: vec![PROTOCOL_VERSION],
        });

        if let Err(e) = self.send(id, &message) {
            self.set_state(id, EdgeState::Disconnecting(format!("Failed to negotiate protocol: {}", e)));
        }
    }

    pub(crate) fn connecting_handle_message(&mut self, id: EdgeId, message: Message) {
        match message {
            Message::SupportedProtocolVersions(message) => {
                self.handle_supported_protocol_versions(id, message);
            }
            Message::InitConnection(message) => self.handle_init_connection(id, message),
            Message::ConnectionAccepted(message) => self.handle_connection_accepted(id, message),
            Message::GracefullyClose(message) => {
                self.set_state(id, EdgeState::Disconnected(message.reason));
            }
            Message::TerminateNetwork(message) => {
                self.set_state(id, EdgeState::Disconnected(message.reason.clone()));
                self.terminated(message);
            }
            Message::Publish(_) | Message::Subscribe(_) | Message::Unsubscribe(_) => {
                warn!("边 {} 握手阶段收到 {} 消息", id, message.kind());
                self.set_state(
                    id,
                    EdgeState::Disconnecting("Unexpected message during connection".to_string()),
                );
            }
            Message::Malformed(_) => {
                self.set_state(id, EdgeState::Disconnecting(MALFORMED_MESSAGE_REASON.to_string()));
            }
        }
    }

    fn handle_supported_protocol_versions(&mut self, id: EdgeId, message: SupportedProtocolVersionsMessage) {
        let Some(edge) = self.edge_mut(id) else {
            return;
        };

        edge.info.bridged_node_supported_protocol_versions = message.supported_protocol_versions.clone();
        if !message.supported_protocol_versions.contains(&PROTOCOL_VERSION) {
            self.set_state(id, EdgeState::Disconnecting("No compatible protocol version".to_string()));
            return;
        }
        edge.info.negotiated_protocol_version = PROTOCOL_VERSION;
        debug!("边 {} 协商协议版本: {}", id, PROTOCOL_VERSION);

        let host_frame = DataFrame::direct(self.host_id());
        let reply = if message.frame.ttl == ONLY_DIRECT_CONNECTION_WITH_RESPONSE_TTL {
            Message::SupportedProtocolVersions(SupportedProtocolVersionsMessage {
                frame: host_frame,
                supported_protocol_versions: vec![PROTOCOL_VERSION],
            })
        } else {
            Message::InitConnection(InitConnectionMessage {
                frame: host_frame,
                max_message_size: self.config.host_max_incoming_message_size,
            })
        };

        if let Err(e) = self.send(id, &reply) {
            self.set_state(id, EdgeState::Disconnecting(format!("Failed to negotiate protocol: {}", e)));
        }
    }

    /// 校验握手消息，返回失败原因
    fn validate_handshake(&self, id: EdgeId, frame: &DataFrame, message_name: &str) -> Option<String> {
        let negotiated = self
            .edge(id)
            .map(|edge| edge.info.negotiated_protocol_version)
            .unwrap_or(UNKNOWN_PROTOCOL_VERSION);

        if negotiated == UNKNOWN_PROTOCOL_VERSION {
            return Some("Unknown protocol version, missing protocol negotiation".to_string());
        }

        if frame.traversed.len() != 1 {
            return Some(format!(
                "Unexpected number of traversed nodes in {} message",
                message_name
            ));
        }

        None
    }

    fn record_bridged_node(&mut self, id: EdgeId, frame: &DataFrame, max_message_size: u64) {
        if let Some(edge) = self.edge_mut(id) {
            edge.info.bridged_node_id = frame.traversed[0].clone();
            edge.info.bridged_node_max_message_size = max_message_size;
        }
    }

    fn handle_init_connection(&mut self, id: EdgeId, message: InitConnectionMessage) {
        if let Some(reason) = self.validate_handshake(id, &message.frame, "init connection") {
            self.set_state(id, EdgeState::Disconnecting(reason));
            return;
        }

        self.record_bridged_node(id, &message.frame, message.max_message_size);

        let reply = Message::ConnectionAccepted(ConnectionAcceptedMessage {
            frame: DataFrame::direct(self.host_id()),
            max_message_size: self.config.host_max_incoming_message_size,
        });
        if let Err(e) = self.send(id, &reply) {
            self.set_state(id, EdgeState::Disconnecting(format!("Failed to accept connection: {}", e)));
            return;
        }

        self.set_state(id, EdgeState::Connected);
    }

    fn handle_connection_accepted(&mut self, id: EdgeId, message: ConnectionAcceptedMessage) {
        if let Some(reason) = self.validate_handshake(id, &message.frame, "connection accepted") {
            self.set_state(id, EdgeState::Disconnecting(reason));
            return;
        }

        self.record_bridged_node(id, &message.frame, message.max_message_size);
        self.set_state(id, EdgeState::Connected);
    }
}
