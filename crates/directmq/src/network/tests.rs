use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::*;
use crate::errors::{Error, Result};
use crate::portal::Portal;
use crate::protocol::{
    ConnectionAcceptedMessage, DataFrame, DeliveryStrategy, GracefullyCloseMessage,
    InitConnectionMessage, Message, Protocol, ProtobufProtocol, PublishMessage, SubscribeMessage,
    SupportedProtocolVersionsMessage, ONLY_DIRECT_CONNECTION_WITH_RESPONSE_TTL, PROTOCOL_VERSION,
};

// ==================== 内存传输 ====================

#[derive(Default)]
struct LoopbackPortal {
    outbox: Mutex<VecDeque<Vec<u8>>>,
    closed: AtomicBool,
}

impl LoopbackPortal {
    fn pop(&self) -> Option<Vec<u8>> {
        self.outbox.lock().pop_front()
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Portal for LoopbackPortal {
    fn write_packet(&self, packet: Vec<u8>) -> Result<()> {
        if self.is_closed() {
            return Err(Error::PortalClosed);
        }
        self.outbox.lock().push_back(packet);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct Side {
    node: usize,
    edge: EdgeId,
    portal: Arc<LoopbackPortal>,
    close_delivered: bool,
}

struct Link {
    connecting: Side,
    listening: Side,
}

type Log = Arc<Mutex<Vec<String>>>;

struct TestNetwork {
    protocol: Arc<dyn Protocol>,
    nodes: Vec<NetworkNode>,
    events: Vec<Log>,
    received: Vec<Log>,
    links: Vec<Link>,
}

impl TestNetwork {
    fn new() -> Self {
        Self::with_protocol(ProtobufProtocol::binary())
    }

    fn with_protocol(protocol: ProtobufProtocol) -> Self {
        Self {
            protocol: Arc::new(protocol),
            nodes: Vec::new(),
            events: Vec::new(),
            received: Vec::new(),
            links: Vec::new(),
        }
    }

    fn add_node(&mut self, id: &str) -> usize {
        self.add_configured_node(NetworkNodeConfig::new(id))
    }

    fn add_configured_node(&mut self, config: NetworkNodeConfig) -> usize {
        let node = NetworkNode::new(config, self.protocol.clone()).unwrap();
        let events: Log = Arc::default();

        let log = events.clone();
        node.on_connection_established(move |id, _edge| {
            log.lock().push(format!("established:{}", id));
        });
        let log = events.clone();
        node.on_connection_lost(move |id, reason, _edge| {
            log.lock().push(format!("lost:{}:{}", id, reason));
        });
        let log = events.clone();
        node.on_subscription(move |message| {
            let prefix = if message.frame.traversed.is_empty() { "local-subscription" } else { "subscription" };
            log.lock().push(format!("{}:{}", prefix, message.topic));
        });
        let log = events.clone();
        node.on_unsubscription(move |message| {
            let prefix = if message.frame.traversed.is_empty() { "local-unsubscription" } else { "unsubscription" };
            log.lock().push(format!("{}:{}", prefix, message.topic));
        });
        let log = events.clone();
        node.on_network_terminated(move |message| {
            log.lock().push(format!("terminated:{}", message.reason));
        });

        self.nodes.push(node);
        self.events.push(events);
        self.received.push(Arc::default());
        self.nodes.len() - 1
    }

    fn node(&self, index: usize) -> &NetworkNode {
        &self.nodes[index]
    }

    fn subscribe(&self, index: usize, pattern: &str) -> crate::subscription::SubscriptionId {
        let log = self.received[index].clone();
        self.nodes[index]
            .subscribe(pattern, move |topic, payload| {
                log.lock().push(format!("{}:{}", topic, String::from_utf8_lossy(payload)));
            })
            .unwrap()
    }

    fn publish(&self, index: usize, topic: &str, payload: &str, strategy: DeliveryStrategy) {
        self.nodes[index].publish(topic, payload.as_bytes(), strategy).unwrap();
    }

    fn received(&self, index: usize) -> Vec<String> {
        self.received[index].lock().clone()
    }

    fn events(&self, index: usize) -> Vec<String> {
        self.events[index].lock().clone()
    }

    fn events_with_prefix(&self, index: usize, prefix: &str) -> Vec<String> {
        self.events(index)
            .into_iter()
            .filter(|event| event.starts_with(prefix))
            .collect()
    }

    /// `from` 主动连接 `to`
    fn connect(&mut self, from: usize, to: usize) -> usize {
        let listening_portal = Arc::new(LoopbackPortal::default());
        let listening_edge = self.nodes[to].add_listening_edge(listening_portal.clone());

        let connecting_portal = Arc::new(LoopbackPortal::default());
        let connecting_edge = self.nodes[from].add_connecting_edge(connecting_portal.clone());

        self.links.push(Link {
            connecting: Side {
                node: from,
                edge: connecting_edge,
                portal: connecting_portal,
                close_delivered: false,
            },
            listening: Side {
                node: to,
                edge: listening_edge,
                portal: listening_portal,
                close_delivered: false,
            },
        });
        self.pump();
        self.links.len() - 1
    }

    /// 链路中监听一端的节点与边
    fn listening_side(&self, link: usize) -> (usize, EdgeId) {
        let side = &self.links[link].listening;
        (side.node, side.edge)
    }

    /// 绕过握手直接把消息交给节点的某条边
    fn inject(&self, index: usize, edge: EdgeId, message: &Message) {
        let packet = self.protocol.encode(message).unwrap();
        let _ = self.nodes[index].handle_packet(edge, &packet);
    }

    fn deliver(nodes: &[NetworkNode], from: &mut Side, to: &Side) -> bool {
        let mut progressed = false;
        while let Some(packet) = from.portal.pop() {
            let _ = nodes[to.node].handle_packet(to.edge, &packet);
            progressed = true;
        }

        if from.portal.is_closed() && !from.close_delivered {
            from.close_delivered = true;
            nodes[to.node].portal_closed(to.edge, "Connection closed by bridged node");
            progressed = true;
        }
        progressed
    }

    /// 交换所有排队的数据包，直到网络静止
    fn pump(&mut self) {
        loop {
            let mut progressed = false;
            for link in self.links.iter_mut() {
                progressed |= Self::deliver(&self.nodes, &mut link.connecting, &link.listening);
                progressed |= Self::deliver(&self.nodes, &mut link.listening, &link.connecting);
            }
            if !progressed {
                break;
            }
        }
    }
}

// ==================== 握手 ====================

#[test]
fn test_pair_handshake() {
    let mut network = TestNetwork::new();
    let a = network.add_node("a");
    let b = network.add_node("b");
    network.connect(a, b);

    assert_eq!(network.node(a).bridged_node_ids(), vec!["b"]);
    assert_eq!(network.node(b).bridged_node_ids(), vec!["a"]);
    assert_eq!(network.events(a), vec!["established:b"]);
    assert_eq!(network.events(b), vec!["established:a"]);

    let edges = network.node(a).edges();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].role, EdgeRole::Connecting);
    assert_eq!(edges[0].state, "connected");
}

#[test]
fn test_pair_handshake_over_json() {
    let mut network = TestNetwork::with_protocol(ProtobufProtocol::json());
    let a = network.add_node("a");
    let b = network.add_node("b");
    network.subscribe(b, "test/*");
    network.connect(a, b);

    network.publish(a, "test/json", "payload", DeliveryStrategy::AtLeastOnce);
    network.pump();
    assert_eq!(network.received(b), vec!["test/json:payload"]);
}

#[test]
fn test_init_connection_without_negotiation() {
    let protocol = ProtobufProtocol::binary();
    let node = NetworkNode::new(NetworkNodeConfig::new("a"), Arc::new(protocol)).unwrap();
    let portal = Arc::new(LoopbackPortal::default());
    let edge = node.add_listening_edge(portal.clone());

    let init = Message::InitConnection(InitConnectionMessage {
        frame: DataFrame::direct("x"),
        max_message_size: 0,
    });
    node.handle_packet(edge, &protocol.encode(&init).unwrap()).unwrap();

    let reply = protocol.decode(&portal.pop().unwrap());
    assert_eq!(
        reply,
        Message::GracefullyClose(GracefullyCloseMessage {
            frame: DataFrame::direct("a"),
            reason: "Unknown protocol version, missing protocol negotiation".to_string(),
        })
    );
    assert!(portal.is_closed());
    assert!(node.edges().is_empty());
}

#[test]
fn test_publish_during_handshake_disconnects() {
    let protocol = ProtobufProtocol::binary();
    let node = NetworkNode::new(NetworkNodeConfig::new("a"), Arc::new(protocol)).unwrap();
    let portal = Arc::new(LoopbackPortal::default());
    let edge = node.add_listening_edge(portal.clone());

    let publish = Message::Publish(PublishMessage {
        frame: DataFrame::new(5, vec!["x".to_string()]),
        topic: "topic".to_string(),
        delivery_strategy: DeliveryStrategy::AtLeastOnce,
        payload: b"data".to_vec(),
    });
    node.handle_packet(edge, &protocol.encode(&publish).unwrap()).unwrap();

    match protocol.decode(&portal.pop().unwrap()) {
        Message::GracefullyClose(message) => {
            assert_eq!(message.reason, "Unexpected message during connection");
        }
        other => panic!("unexpected reply: {:?}", other),
    }
}

#[test]
fn test_incompatible_protocol_version() {
    let mut network = TestNetwork::new();
    let a = network.add_node("a");
    let portal = Arc::new(LoopbackPortal::default());
    let edge = network.node(a).add_listening_edge(portal.clone());

    let versions = Message::SupportedProtocolVersions(SupportedProtocolVersionsMessage {
        frame: DataFrame::new(ONLY_DIRECT_CONNECTION_WITH_RESPONSE_TTL, vec!["x".to_string()]),
        supported_protocol_versions: vec![2],
    });
    network.inject(a, edge, &versions);

    match network.protocol.decode(&portal.pop().unwrap()) {
        Message::GracefullyClose(message) => {
            assert_eq!(message.reason, "No compatible protocol version");
        }
        other => panic!("unexpected reply: {:?}", other),
    }
    assert!(portal.is_closed());
    assert_eq!(network.events(a), vec!["lost::No compatible protocol version"]);
}

#[test]
fn test_init_connection_with_extra_traversed_nodes() {
    let mut network = TestNetwork::new();
    let a = network.add_node("a");
    let portal = Arc::new(LoopbackPortal::default());
    let edge = network.node(a).add_listening_edge(portal.clone());

    let versions = Message::SupportedProtocolVersions(SupportedProtocolVersionsMessage {
        frame: DataFrame::new(ONLY_DIRECT_CONNECTION_WITH_RESPONSE_TTL, vec!["x".to_string()]),
        supported_protocol_versions: vec![PROTOCOL_VERSION],
    });
    network.inject(a, edge, &versions);
    assert!(matches!(
        network.protocol.decode(&portal.pop().unwrap()),
        Message::SupportedProtocolVersions(_)
    ));

    let init = Message::InitConnection(InitConnectionMessage {
        frame: DataFrame::new(1, vec!["x".to_string(), "y".to_string()]),
        max_message_size: 0,
    });
    network.inject(a, edge, &init);

    assert!(portal.is_closed());
    assert!(network.node(a).edges().is_empty());
    assert_eq!(
        network.events(a),
        vec!["lost::Unexpected number of traversed nodes in init connection message"]
    );
}

#[test]
fn test_connection_accepted_with_extra_traversed_nodes() {
    let mut network = TestNetwork::new();
    let a = network.add_node("a");
    let portal = Arc::new(LoopbackPortal::default());
    let edge = network.node(a).add_connecting_edge(portal.clone());
    assert!(matches!(
        network.protocol.decode(&portal.pop().unwrap()),
        Message::SupportedProtocolVersions(_)
    ));

    let versions = Message::SupportedProtocolVersions(SupportedProtocolVersionsMessage {
        frame: DataFrame::direct("x"),
        supported_protocol_versions: vec![PROTOCOL_VERSION],
    });
    network.inject(a, edge, &versions);
    assert!(matches!(
        network.protocol.decode(&portal.pop().unwrap()),
        Message::InitConnection(_)
    ));

    let accepted = Message::ConnectionAccepted(ConnectionAcceptedMessage {
        frame: DataFrame::new(1, vec!["x".to_string(), "y".to_string()]),
        max_message_size: 0,
    });
    network.inject(a, edge, &accepted);

    assert!(portal.is_closed());
    assert_eq!(
        network.events(a),
        vec!["lost::Unexpected number of traversed nodes in connection accepted message"]
    );
}

#[test]
fn test_handshake_message_on_connected_edge() {
    let mut network = TestNetwork::new();
    let a = network.add_node("a");
    let b = network.add_node("b");
    let link = network.connect(a, b);
    let (listening, edge) = network.listening_side(link);

    let versions = Message::SupportedProtocolVersions(SupportedProtocolVersionsMessage {
        frame: DataFrame::new(ONLY_DIRECT_CONNECTION_WITH_RESPONSE_TTL, vec!["a".to_string()]),
        supported_protocol_versions: vec![PROTOCOL_VERSION],
    });
    network.inject(listening, edge, &versions);
    network.pump();

    assert_eq!(network.events_with_prefix(b, "lost:"), vec!["lost:a:Unexpected handshake message"]);
    assert_eq!(network.events_with_prefix(a, "lost:"), vec!["lost:b:Unexpected handshake message"]);
    assert!(network.node(a).edges().is_empty());
    assert!(network.node(b).edges().is_empty());
}

#[test]
fn test_unknown_edge() {
    let node = NetworkNode::new(NetworkNodeConfig::new("a"), Arc::new(ProtobufProtocol::binary())).unwrap();
    assert!(matches!(node.handle_packet(EdgeId(42), b"x"), Err(Error::EdgeNotFound(42))));
    assert!(!node.remove_edge(EdgeId(42), "reason"));
}

// ==================== 本地 API ====================

#[test]
fn test_native_api_validation() {
    let node = NetworkNode::new(NetworkNodeConfig::new("a"), Arc::new(ProtobufProtocol::binary())).unwrap();

    assert!(matches!(
        node.publish("test/*", "x", DeliveryStrategy::AtLeastOnce),
        Err(Error::InvalidTopic(_))
    ));
    assert!(matches!(
        node.publish("test", Vec::new(), DeliveryStrategy::AtLeastOnce),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(node.subscribe("bad//pattern", |_, _| {}), Err(Error::InvalidTopicPattern(_))));

    let id = node.subscribe("test/**", |_, _| {}).unwrap();
    assert_eq!(node.subscribed_topics(), vec!["test/**"]);
    assert!(node.unsubscribe(id).is_ok());
    assert!(node.unsubscribe(id).is_err());
    assert!(node.subscribed_topics().is_empty());
}

#[test]
fn test_local_delivery_and_strategies() {
    let mut network = TestNetwork::new();
    let a = network.add_node("a");
    network.subscribe(a, "test/*");
    network.subscribe(a, "test/a");

    network.publish(a, "test/a", "all", DeliveryStrategy::AtLeastOnce);
    let mut received = network.received(a);
    received.sort();
    assert_eq!(received, vec!["test/a:all", "test/a:all"]);

    network.publish(a, "test/a", "one", DeliveryStrategy::AtMostOnce);
    let once: Vec<_> = network.received(a).into_iter().filter(|r| r.ends_with(":one")).collect();
    assert_eq!(once.len(), 1);

    assert_eq!(network.events(a), vec!["local-subscription:test/*"]);
}

#[test]
fn test_handler_can_reenter_node() {
    let node = NetworkNode::new(NetworkNodeConfig::new("a"), Arc::new(ProtobufProtocol::binary())).unwrap();
    let received: Log = Arc::default();

    let log = received.clone();
    node.subscribe("reply", move |_, payload| {
        log.lock().push(String::from_utf8_lossy(payload).to_string());
    })
    .unwrap();

    let inner = node.clone();
    node.subscribe("ping", move |_, _| {
        inner.publish("reply", "pong", DeliveryStrategy::AtLeastOnce).unwrap();
    })
    .unwrap();

    node.publish("ping", "ping", DeliveryStrategy::AtLeastOnce).unwrap();
    assert_eq!(*received.lock(), vec!["pong"]);
}

// ==================== 订阅同步 ====================

#[test]
fn test_existing_subscriptions_sent_on_connect() {
    let mut network = TestNetwork::new();
    let master = network.add_node("master");
    let salve = network.add_node("salve");
    network.subscribe(master, "topic1");
    network.subscribe(master, "topic2");
    network.connect(salve, master);

    assert_eq!(
        network.events_with_prefix(salve, "subscription:"),
        vec!["subscription:topic1", "subscription:topic2"]
    );
}

#[test]
fn test_graceful_close_revokes_subscriptions() {
    let mut network = TestNetwork::new();
    let master = network.add_node("master");
    let salve = network.add_node("salve");
    network.subscribe(master, "topic1");
    network.subscribe(master, "topic2");
    network.connect(salve, master);

    network.node(master).close("Stopped");
    network.pump();

    assert!(network.node(master).edges().is_empty());
    assert!(network.node(salve).edges().is_empty());

    let events = network.events(salve);
    let tail: Vec<_> = events.iter().skip_while(|e| !e.starts_with("lost:")).cloned().collect();
    assert_eq!(
        tail,
        vec!["lost:master:Stopped", "unsubscription:topic1", "unsubscription:topic2"]
    );
    assert_eq!(network.events_with_prefix(master, "lost:"), vec!["lost:salve:Stopped"]);
}

#[test]
fn test_unsubscribe_propagates() {
    let mut network = TestNetwork::new();
    let a = network.add_node("a");
    let b = network.add_node("b");
    network.connect(a, b);

    let id = network.subscribe(b, "news");
    network.pump();
    assert_eq!(network.events_with_prefix(a, "subscription:"), vec!["subscription:news"]);

    network.node(b).unsubscribe(id).unwrap();
    network.pump();
    assert_eq!(network.events_with_prefix(a, "unsubscription:"), vec!["unsubscription:news"]);

    network.publish(a, "news", "late", DeliveryStrategy::AtLeastOnce);
    network.pump();
    assert!(network.received(b).is_empty());
}

#[test]
fn test_central_point_hierarchy() {
    let mut network = TestNetwork::new();
    let central = network.add_node("central");
    let left = network.add_node("left");
    let top = network.add_node("top");
    let right = network.add_node("right");
    network.connect(left, central);
    network.connect(top, central);
    network.connect(right, central);

    network.subscribe(left, "test/1");
    network.pump();
    network.subscribe(top, "test/*");
    network.pump();

    assert_eq!(
        network.events_with_prefix(right, "subscription:"),
        vec!["subscription:test/1", "subscription:test/*"]
    );
    assert_eq!(
        network.events_with_prefix(right, "unsubscription:"),
        vec!["unsubscription:test/1"]
    );
    assert_eq!(network.events_with_prefix(left, "subscription:"), vec!["subscription:test/*"]);
    assert!(network.events_with_prefix(left, "unsubscription:").is_empty());

    network.publish(right, "test/1", "hello", DeliveryStrategy::AtLeastOnce);
    network.pump();
    assert_eq!(network.received(left), vec!["test/1:hello"]);
    assert_eq!(network.received(top), vec!["test/1:hello"]);
}

// ==================== 路由 ====================

#[test]
fn test_publication_reaches_remote_and_local_subscribers() {
    let mut network = TestNetwork::new();
    let a = network.add_node("a");
    let b = network.add_node("b");
    network.subscribe(a, "test/*");
    network.subscribe(b, "test/a");
    network.connect(a, b);

    network.publish(b, "test/a", "hi", DeliveryStrategy::AtLeastOnce);
    network.pump();

    assert_eq!(network.received(a), vec!["test/a:hi"]);
    assert_eq!(network.received(b), vec!["test/a:hi"]);
}

#[test]
fn test_at_most_once_delivers_once_across_network() {
    let mut network = TestNetwork::new();
    let publisher = network.add_node("publisher");
    let first = network.add_node("first");
    let second = network.add_node("second");
    network.subscribe(first, "jobs");
    network.subscribe(second, "jobs");
    network.connect(first, publisher);
    network.connect(second, publisher);

    for _ in 0..10 {
        network.publish(publisher, "jobs", "job", DeliveryStrategy::AtMostOnce);
    }
    network.pump();

    assert_eq!(network.received(first).len() + network.received(second).len(), 10);
}

#[test]
fn test_ttl_limits_reach() {
    let mut network = TestNetwork::new();
    let left = network.add_configured_node(NetworkNodeConfig::new("left").with_ttl(3));
    let middle = network.add_configured_node(NetworkNodeConfig::new("middle").with_ttl(2));
    let right = network.add_configured_node(NetworkNodeConfig::new("right").with_ttl(2));
    for node in [left, middle, right] {
        network.subscribe(node, "topic");
    }
    network.connect(left, middle);
    network.connect(right, middle);

    network.publish(left, "topic", "from-left", DeliveryStrategy::AtLeastOnce);
    network.publish(right, "topic", "from-right", DeliveryStrategy::AtLeastOnce);
    network.pump();

    let mut right_received = network.received(right);
    right_received.sort();
    assert_eq!(right_received, vec!["topic:from-left", "topic:from-right"]);
    assert_eq!(network.received(left), vec!["topic:from-left"]);
    let mut middle_received = network.received(middle);
    middle_received.sort();
    assert_eq!(middle_received, vec!["topic:from-left", "topic:from-right"]);
}

#[test]
fn test_exhausted_ttl_from_network_is_dropped() {
    let mut network = TestNetwork::new();
    let a = network.add_node("a");
    let b = network.add_node("b");
    let c = network.add_node("c");
    network.subscribe(c, "topic");
    let link = network.connect(a, b);
    network.connect(b, c);
    let (listening, edge) = network.listening_side(link);

    let publish = Message::Publish(PublishMessage {
        frame: DataFrame::new(i32::MIN, vec!["a".to_string()]),
        topic: "topic".to_string(),
        delivery_strategy: DeliveryStrategy::AtLeastOnce,
        payload: b"expired".to_vec(),
    });
    network.inject(listening, edge, &publish);
    let subscribe = Message::Subscribe(SubscribeMessage {
        frame: DataFrame::new(i32::MIN, vec!["a".to_string()]),
        topic: "other".to_string(),
    });
    network.inject(listening, edge, &subscribe);
    network.pump();

    assert!(network.received(c).is_empty());
    assert!(network.events_with_prefix(c, "subscription:other").is_empty());
    assert_eq!(network.node(b).bridged_node_ids().len(), 2);

    network.publish(a, "topic", "fresh", DeliveryStrategy::AtLeastOnce);
    network.pump();
    assert_eq!(network.received(c), vec!["topic:fresh"]);
}

#[test]
fn test_max_message_size() {
    let mut network = TestNetwork::new();
    let publisher = network.add_node("publisher");
    let large = network.add_configured_node(NetworkNodeConfig::new("large").with_max_incoming_message_size(5));
    let small = network.add_configured_node(NetworkNodeConfig::new("small").with_max_incoming_message_size(3));
    network.subscribe(large, "topic");
    network.subscribe(small, "topic");
    network.connect(large, publisher);
    network.connect(small, publisher);

    network.publish(publisher, "topic", "test", DeliveryStrategy::AtLeastOnce);
    network.pump();

    assert_eq!(network.received(large), vec!["topic:test"]);
    assert!(network.received(small).is_empty());
}

#[test]
fn test_loop_terminates_network() {
    let mut network = TestNetwork::new();
    let a = network.add_node("a");
    let b = network.add_node("b");
    let c = network.add_node("c");
    network.connect(a, b);
    network.connect(b, c);
    network.connect(c, a);

    network.subscribe(a, "topic");
    network.pump();

    for node in [a, b, c] {
        assert!(network.node(node).edges().is_empty(), "node {} still has edges", node);
        let terminated = network.events_with_prefix(node, "terminated:");
        assert!(!terminated.is_empty(), "node {} did not observe termination", node);
        assert!(terminated[0].starts_with("terminated:Network loop detected: "));
    }
}

#[test]
fn test_terminate_network_floods() {
    let mut network = TestNetwork::new();
    let a = network.add_node("a");
    let b = network.add_node("b");
    let c = network.add_node("c");
    network.connect(a, b);
    network.connect(c, b);

    network.node(a).terminate_network("maintenance");
    network.pump();

    for node in [a, b, c] {
        assert!(network.node(node).edges().is_empty());
        assert_eq!(network.events_with_prefix(node, "terminated:")[0], "terminated:maintenance");
    }
    assert_eq!(network.events_with_prefix(c, "lost:"), vec!["lost:b:maintenance"]);
}

// ==================== 异常 ====================

#[test]
fn test_malformed_packet_disconnects() {
    let mut network = TestNetwork::new();
    let a = network.add_node("a");
    let b = network.add_node("b");
    let link = network.connect(a, b);

    let edge = network.links[link].listening.edge;
    network.node(b).handle_packet(edge, &[0xff, 0xff, 0xff]).unwrap();
    network.pump();

    assert!(network.node(a).edges().is_empty());
    assert!(network.node(b).edges().is_empty());
    assert_eq!(network.events_with_prefix(a, "lost:"), vec!["lost:b:Malformed message received"]);
}

#[test]
fn test_transport_loss() {
    let mut network = TestNetwork::new();
    let a = network.add_node("a");
    let b = network.add_node("b");
    network.subscribe(a, "topic");
    let link = network.connect(a, b);

    let edge = network.links[link].listening.edge;
    network.node(b).portal_closed(edge, "connection reset");
    network.pump();

    assert_eq!(
        network.events_with_prefix(b, "lost:"),
        vec!["lost:a:connection reset"]
    );
    assert_eq!(network.events_with_prefix(b, "unsubscription:"), vec!["unsubscription:topic"]);
    assert!(network.node(a).edges().is_empty());
}
