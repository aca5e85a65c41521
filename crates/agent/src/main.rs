/// DirectMQ - 测试代理
///
/// 从标准输入读取 JSON 命令，向标准输出写出 JSON 通知，日志写到标准错误

use tokio::io::BufReader;
use tracing::info;

mod agent;
mod commands;
mod config;
mod notifications;
mod notifier;

use agent::Agent;
use notifier::Notifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置
    dotenvy::dotenv().ok();
    let cfg = config::Config::from_env()?;

    // 标准输出只用于通知，日志写到标准错误
    // 可以通过环境变量 RUST_LOG 覆盖日志级别
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_line_number(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log_level)),
        )
        .init();

    info!("🚀 启动 DirectMQ 测试代理...");
    info!("✅ 配置加载成功: 协议 {:?}, 帧类型 {:?}", cfg.protocol, cfg.messages_type);

    let (notifier, _writer) = Notifier::spawn(tokio::io::stdout());
    let agent = Agent::new(cfg, notifier);

    let code = agent.run(BufReader::new(tokio::io::stdin())).await;
    info!("代理退出，退出码 {}", code);
    std::process::exit(code);
}
