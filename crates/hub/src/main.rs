/// DirectMQ - Hub
///
/// 长期运行的 DirectMQ 节点，接受 WebSocket 连接并可主动连接上游

mod app_state;
mod config;
mod status;
mod upstream;

use axum::{routing::get, Router};
use directmq::{portals, NetworkNode, ProtobufProtocol};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::app_state::AppState;

/// 关闭时发送给对端的原因
const SHUTDOWN_REASON: &str = "Hub shutting down";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载环境变量
    dotenvy::dotenv().ok();

    // 加载配置
    let cfg = config::Config::from_env()?;

    // 初始化日志
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log_level)),
        )
        .init();

    info!("🚀 启动 DirectMQ Hub...");
    info!("✅ 配置加载成功");

    // 创建节点
    let protocol = Arc::new(ProtobufProtocol::new(cfg.protocol));
    let node = NetworkNode::new(cfg.node_config(), protocol)?;
    register_diagnostics(&node);
    info!("📌 节点 ID: {}", node.host_id());

    let app_state = AppState::new(node.clone());

    // 构建应用路由
    let app = Router::new()
        .route("/", get(status::root_handler))
        .route("/health", get(status::health_handler))
        .route("/status", get(status::status_handler))
        .with_state(app_state)
        .merge(portals::router(&cfg.ws_path, cfg.messages_type, node.clone()))
        .layer(TraceLayer::new_for_http());

    let shutdown = CancellationToken::new();

    // 连接上游节点
    for url in cfg.upstreams.iter().cloned() {
        info!("🎯 上游节点: {}", url);
        tokio::spawn(upstream::maintain_upstream(
            url,
            cfg.messages_type,
            node.clone(),
            Duration::from_secs(cfg.reconnect_interval),
            shutdown.clone(),
        ));
    }

    // 启动服务器
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    info!("🎯 服务器监听在 http://{}，WebSocket 路径 {}", addr, cfg.ws_path);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(node, shutdown))
        .await?;

    info!("👋 Hub 已停止");
    Ok(())
}

/// 等待 Ctrl-C，然后优雅关闭节点
async fn shutdown_signal(node: NetworkNode, shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("监听 Ctrl-C 失败: {}", e);
    }

    info!("🛑 收到关闭信号");
    shutdown.cancel();
    node.close(SHUTDOWN_REASON);
}

fn register_diagnostics(node: &NetworkNode) {
    node.on_connection_established(|bridged_node_id, edge| {
        info!("🔗 节点 {} 已连接 ({})", bridged_node_id, edge);
    });

    node.on_connection_lost(|bridged_node_id, reason, edge| {
        info!("节点 {} 已断开 ({}): {}", bridged_node_id, edge, reason);
    });

    node.on_subscription(|message| {
        info!("📥 订阅 {} 来自 {:?}", message.topic, message.frame.traversed);
    });

    node.on_unsubscription(|message| {
        info!("📤 取消订阅 {} 来自 {:?}", message.topic, message.frame.traversed);
    });

    node.on_publication(|message| {
        debug!(
            "发布 {} ({} 字节) 经过 {:?}",
            message.topic,
            message.payload.len(),
            message.frame.traversed
        );
    });

    node.on_network_terminated(|message| {
        warn!("⚠️ 网络已终止: {}", message.reason);
    });
}
