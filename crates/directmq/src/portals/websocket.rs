/// WebSocket 传输
///
/// 每个 WebSocket 连接对应节点上的一条边。
/// 写入经由无界通道交给发送任务，接收任务把数据包交给节点处理

use axum::extract::ws::{Message as AxumWsMessage, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as TungsteniteMessage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::{Error, Result};
use crate::network::{EdgeId, NetworkNode};
use crate::portal::Portal;

/// 对端关闭连接时的断开原因
pub const CLOSED_BY_BRIDGED_NODE: &str = "Connection closed by bridged node";

/// WebSocket 帧类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessagesType {
    Text,
    #[default]
    Binary,
}

impl FromStr for MessagesType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "text" => Ok(MessagesType::Text),
            "binary" => Ok(MessagesType::Binary),
            other => Err(Error::InvalidArgument(format!("未知 WebSocket 帧类型: {}", other))),
        }
    }
}

// ==================== Portal ====================

enum Outgoing {
    Packet(Vec<u8>),
    Close,
}

enum Incoming {
    Packet(Vec<u8>),
    Closed,
    Ignored,
}

pub struct WebsocketPortal {
    sender: mpsc::UnboundedSender<Outgoing>,
    closed: AtomicBool,
}

impl WebsocketPortal {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Outgoing>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let portal = Arc::new(Self {
            sender,
            closed: AtomicBool::new(false),
        });
        (portal, receiver)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Portal for WebsocketPortal {
    fn write_packet(&self, packet: Vec<u8>) -> Result<()> {
        if self.is_closed() {
            return Err(Error::PortalClosed);
        }
        self.sender
            .send(Outgoing::Packet(packet))
            .map_err(|_| Error::PortalClosed)
    }

    fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.sender.send(Outgoing::Close);
        }
        Ok(())
    }
}

// ==================== 收发循环 ====================

async fn write_loop<S, M>(
    mut sink: S,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
    encode: impl Fn(Vec<u8>) -> Option<M>,
) where
    S: Sink<M> + Unpin,
    S::Error: Display,
{
    while let Some(item) = outgoing.recv().await {
        match item {
            Outgoing::Packet(packet) => {
                let Some(message) = encode(packet) else {
                    continue;
                };
                if let Err(e) = sink.send(message).await {
                    warn!("发送 WebSocket 消息失败: {}", e);
                    break;
                }
            }
            Outgoing::Close => break,
        }
    }

    let _ = sink.close().await;
    debug!("WebSocket 发送任务结束");
}

/// 读取直到连接结束，返回断开原因
async fn read_loop<St, M, E>(
    mut stream: St,
    node: &NetworkNode,
    edge: EdgeId,
    decode: impl Fn(M) -> Incoming,
) -> String
where
    St: Stream<Item = std::result::Result<M, E>> + Unpin,
    E: Display,
{
    while let Some(result) = stream.next().await {
        match result {
            Ok(message) => match decode(message) {
                Incoming::Packet(packet) => {
                    if let Err(e) = node.handle_packet(edge, &packet) {
                        debug!("边 {} 已不可用: {}", edge, e);
                        break;
                    }
                }
                Incoming::Closed => break,
                Incoming::Ignored => {}
            },
            Err(e) => {
                warn!("接收 WebSocket 消息错误: {}", e);
                return format!("Connection error: {}", e);
            }
        }
    }
    CLOSED_BY_BRIDGED_NODE.to_string()
}

fn text_packet(packet: Vec<u8>) -> Option<String> {
    match String::from_utf8(packet) {
        Ok(text) => Some(text),
        Err(e) => {
            error!("文本帧只能承载 UTF-8 数据包: {}", e);
            None
        }
    }
}

fn encode_tungstenite(messages_type: MessagesType) -> impl Fn(Vec<u8>) -> Option<TungsteniteMessage> {
    move |packet| match messages_type {
        MessagesType::Binary => Some(TungsteniteMessage::Binary(packet)),
        MessagesType::Text => text_packet(packet).map(TungsteniteMessage::Text),
    }
}

fn decode_tungstenite(message: TungsteniteMessage) -> Incoming {
    match message {
        TungsteniteMessage::Text(text) => Incoming::Packet(text.into_bytes()),
        TungsteniteMessage::Binary(data) => Incoming::Packet(data),
        TungsteniteMessage::Close(_) => Incoming::Closed,
        _ => Incoming::Ignored,
    }
}

fn encode_axum(messages_type: MessagesType) -> impl Fn(Vec<u8>) -> Option<AxumWsMessage> {
    move |packet| match messages_type {
        MessagesType::Binary => Some(AxumWsMessage::Binary(packet)),
        MessagesType::Text => text_packet(packet).map(AxumWsMessage::Text),
    }
}

fn decode_axum(message: AxumWsMessage) -> Incoming {
    match message {
        AxumWsMessage::Text(text) => Incoming::Packet(text.into_bytes()),
        AxumWsMessage::Binary(data) => Incoming::Packet(data),
        AxumWsMessage::Close(_) => Incoming::Closed,
        _ => Incoming::Ignored,
    }
}

// ==================== 客户端 ====================

/// 连接远端节点，返回新建的边
pub async fn connect(url: &str, messages_type: MessagesType, node: NetworkNode) -> Result<EdgeId> {
    info!("尝试连接到节点: {}", url);
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| Error::Portal(format!("连接 {} 失败: {}", url, e)))?;
    info!("✅ WebSocket 连接成功: {}", url);

    let (ws_sender, ws_receiver) = ws_stream.split();
    let (portal, outgoing) = WebsocketPortal::new();

    let writer = tokio::spawn(write_loop(ws_sender, outgoing, encode_tungstenite(messages_type)));
    let edge = node.add_connecting_edge(portal.clone());

    tokio::spawn(async move {
        let reason = read_loop(ws_receiver, &node, edge, decode_tungstenite).await;
        node.portal_closed(edge, &reason);
        let _ = portal.close();
        let _ = writer.await;
        info!("与 {} 的连接已关闭", edge);
    });

    Ok(edge)
}

// ==================== 服务端 ====================

#[derive(Clone)]
struct WebsocketState {
    node: NetworkNode,
    messages_type: MessagesType,
}

/// 在 `path` 上接受节点连接的路由
pub fn router(path: &str, messages_type: MessagesType, node: NetworkNode) -> Router {
    Router::new()
        .route(path, get(handle_websocket))
        .with_state(WebsocketState { node, messages_type })
}

async fn handle_websocket(ws: WebSocketUpgrade, State(state): State<WebsocketState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| accept(socket, state.messages_type, state.node))
}

/// 处理一个已升级的连接，直到连接关闭
pub async fn accept(socket: WebSocket, messages_type: MessagesType, node: NetworkNode) {
    let (ws_sender, ws_receiver) = socket.split();
    let (portal, outgoing) = WebsocketPortal::new();

    let writer = tokio::spawn(write_loop(ws_sender, outgoing, encode_axum(messages_type)));
    let edge = node.add_listening_edge(portal.clone());
    info!("新的节点连接: {}", edge);

    let reason = read_loop(ws_receiver, &node, edge, decode_axum).await;
    node.portal_closed(edge, &reason);
    let _ = portal.close();
    let _ = writer.await;
    info!("节点连接已关闭: {}", edge);
}

/// 独立运行的 WebSocket 监听服务
pub struct WebsocketServer {
    listener: TcpListener,
    router: Router,
}

impl WebsocketServer {
    pub async fn bind(
        addr: impl ToSocketAddrs,
        path: &str,
        messages_type: MessagesType,
        node: NetworkNode,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Portal(format!("监听失败: {}", e)))?;

        Ok(Self {
            listener,
            router: router(path, messages_type, node),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| Error::Portal(e.to_string()))
    }

    /// 运行直到 `shutdown` 被取消
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        if let Ok(addr) = self.local_addr() {
            info!("🌐 WebSocket 监听: {}", addr);
        }

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| Error::Portal(e.to_string()))
    }
}
