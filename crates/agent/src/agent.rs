/// 测试代理
///
/// 把标准输入的命令映射到 DirectMQ 节点操作，把节点事件写为通知

use anyhow::{anyhow, bail, Context};
use directmq::portals::{self, WebsocketServer};
use directmq::protocol::DeliveryStrategy;
use directmq::{NetworkNode, NetworkNodeConfig, ProtobufProtocol};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use url::Url;

use crate::commands::{
    Command, ConnectCommand, ListenCommand, PublishCommand, SetupCommand, StopCommand,
    SubscribeTopicCommand, UnsubscribeTopicCommand,
};
use crate::config::Config;
use crate::notifications::Notification;
use crate::notifier::Notifier;

/// 输入结束时的关闭原因
pub const INPUT_CLOSED_REASON: &str = "Agent input closed";

/// 退出前留给传输层发送关闭帧的时间
const CLOSE_GRACE_PERIOD: Duration = Duration::from_millis(100);

/// 命令处理后的去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(i32),
}

pub struct Agent {
    config: Config,
    notifier: Notifier,
    node: Option<NetworkNode>,
    shutdown: CancellationToken,
}

impl Agent {
    pub fn new(config: Config, notifier: Notifier) -> Self {
        Self {
            config,
            notifier,
            node: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// 逐行处理命令，返回进程退出码
    pub async fn run<R>(mut self, input: R) -> i32
    where
        R: AsyncBufRead + Unpin,
    {
        self.notifier
            .send(Notification::ready(chrono::Local::now().to_rfc3339()));

        let mut lines = input.lines();
        let code = loop {
            debug!("等待命令");
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!("标准输入已关闭");
                    self.close(INPUT_CLOSED_REASON);
                    break 0;
                }
                Err(e) => break self.fatal(format!("Error during command reading: {}", e)),
            };

            if line.trim().is_empty() {
                continue;
            }

            let command = match Command::parse(&line) {
                Ok(command) => command,
                Err(e) => break self.fatal(format!("Error during command unmarshalling: {}", e)),
            };

            match self.handle(command).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit(code)) => break code,
                Err(e) => break self.fatal(format!("{:#}", e)),
            }
        };

        if self.node.is_some() {
            tokio::time::sleep(CLOSE_GRACE_PERIOD).await;
        }
        self.shutdown.cancel();
        self.notifier.flush().await;
        code
    }

    fn fatal(&self, err: String) -> i32 {
        error!("❌ {}", err);
        self.notifier.send(Notification::fatal(err));
        self.close("Agent failure");
        1
    }

    fn close(&self, reason: &str) {
        if let Some(node) = &self.node {
            node.close(reason);
        }
    }

    fn node(&self) -> anyhow::Result<&NetworkNode> {
        self.node
            .as_ref()
            .ok_or_else(|| anyhow!("Node is not set up, send setup command first"))
    }

    /// 按固定顺序处理命令中的各个字段
    pub async fn handle(&mut self, command: Command) -> anyhow::Result<Flow> {
        if let Some(setup) = command.setup {
            self.handle_setup(setup)?;
        }
        if let Some(listen) = command.listen {
            self.handle_listen(listen).await?;
        }
        if let Some(connect) = command.connect {
            self.handle_connect(connect).await?;
        }
        if let Some(stop) = command.stop {
            return self.handle_stop(stop);
        }
        if let Some(publish) = command.publish {
            self.handle_publish(publish)?;
        }
        if let Some(subscribe) = command.subscribe_topic {
            self.handle_subscribe(subscribe)?;
        }
        if let Some(unsubscribe) = command.unsubscribe_topic {
            self.handle_unsubscribe(unsubscribe)?;
        }
        Ok(Flow::Continue)
    }

    // ==================== 连接 API ====================

    fn handle_setup(&mut self, command: SetupCommand) -> anyhow::Result<()> {
        if self.node.is_some() {
            bail!("Node is already set up");
        }

        info!("⚙️ 初始化节点: {}", command.node_id);
        let config = NetworkNodeConfig {
            host_ttl: command.ttl,
            host_max_incoming_message_size: command.max_message_size,
            host_id: command.node_id,
        };
        let protocol = Arc::new(ProtobufProtocol::new(self.config.protocol));
        let node = NetworkNode::new(config, protocol).context("Failed to set up node")?;

        self.register_diagnostics(&node);
        self.node = Some(node);
        info!("✅ 节点初始化完成");
        Ok(())
    }

    fn register_diagnostics(&self, node: &NetworkNode) {
        let notifier = self.notifier.clone();
        node.on_connection_established(move |bridged_node_id, _edge| {
            notifier.send(Notification::connection_established(bridged_node_id));
        });

        let notifier = self.notifier.clone();
        node.on_connection_lost(move |bridged_node_id, reason, _edge| {
            notifier.send(Notification::connection_lost(bridged_node_id, reason));
        });

        let notifier = self.notifier.clone();
        node.on_publication(move |message| notifier.send(Notification::on_publication(message)));

        let notifier = self.notifier.clone();
        node.on_subscription(move |message| notifier.send(Notification::on_subscription(message)));

        let notifier = self.notifier.clone();
        node.on_unsubscription(move |message| notifier.send(Notification::on_unsubscribe(message)));

        let notifier = self.notifier.clone();
        node.on_network_terminated(move |message| {
            notifier.send(Notification::on_network_termination(message));
        });
    }

    async fn handle_listen(&mut self, command: ListenCommand) -> anyhow::Result<()> {
        let node = self.node()?.clone();
        let url = resolve_address(&command.address, command.port)?;
        let host = url.host_str().unwrap_or("0.0.0.0").to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| anyhow!("Missing port in listen address: {}", url))?;

        info!("👂 监听地址: {}", url);
        let server = WebsocketServer::bind((host.as_str(), port), url.path(), self.config.messages_type, node)
            .await
            .context("Failed to listen on websocket")?;

        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = server.serve(shutdown).await {
                error!("WebSocket 服务异常退出: {}", e);
            }
        });
        Ok(())
    }

    async fn handle_connect(&mut self, command: ConnectCommand) -> anyhow::Result<()> {
        let node = self.node()?.clone();
        let url = resolve_address(&command.address, command.port)?;

        info!("🔗 连接到: {}", url);
        portals::connect(url.as_str(), self.config.messages_type, node)
            .await
            .context("Failed to connect to websocket")?;
        Ok(())
    }

    fn handle_stop(&mut self, command: StopCommand) -> anyhow::Result<Flow> {
        info!("🛑 停止节点: {}", command.reason);
        self.node()?.close(&command.reason);
        self.notifier.send(Notification::stopped(command.reason));
        Ok(Flow::Exit(0))
    }

    // ==================== 本地 API ====================

    fn handle_publish(&mut self, command: PublishCommand) -> anyhow::Result<()> {
        let strategy = DeliveryStrategy::from_u8(command.delivery_strategy)
            .ok_or_else(|| anyhow!("Unknown delivery strategy: {}", command.delivery_strategy))?;

        debug!("发布消息到主题: {}", command.topic);
        self.node()?
            .publish(&command.topic, command.payload, strategy)
            .context("Failed to publish message")?;
        Ok(())
    }

    fn handle_subscribe(&mut self, command: SubscribeTopicCommand) -> anyhow::Result<()> {
        let notifier = self.notifier.clone();
        let id = self
            .node()?
            .subscribe(&command.topic, move |topic, payload| {
                notifier.send(Notification::message_received(topic, payload));
            })
            .context("Failed to subscribe")?;

        debug!("订阅主题 {} ({})", command.topic, id);
        self.notifier.send(Notification::subscribed(id));
        Ok(())
    }

    fn handle_unsubscribe(&mut self, command: UnsubscribeTopicCommand) -> anyhow::Result<()> {
        self.node()?
            .unsubscribe(command.subscription_id)
            .context("Failed to unsubscribe")?;
        Ok(())
    }
}

/// 解析 WebSocket 地址，显式端口覆盖地址中的端口
pub fn resolve_address(address: &str, port: Option<u16>) -> anyhow::Result<Url> {
    let mut url = Url::parse(address).with_context(|| format!("Failed to parse URL: {}", address))?;

    if !matches!(url.scheme(), "ws" | "wss") {
        bail!("Unsupported URL scheme: {}", url.scheme());
    }

    if let Some(port) = port {
        url.set_port(Some(port))
            .map_err(|_| anyhow!("Failed to set port {} on {}", port, address))?;
    }
    Ok(url)
}
