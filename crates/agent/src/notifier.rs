/// 通知输出
///
/// 通知可能来自任意线程（订阅回调、诊断回调），统一经由通道交给单个写入任务，
/// 保证每条通知完整地占据一行

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::notifications::Notification;

enum Outgoing {
    Notification(Notification),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct Notifier {
    sender: mpsc::UnboundedSender<Outgoing>,
}

impl Notifier {
    /// 启动写入任务
    pub fn spawn<W>(mut writer: W) -> (Self, JoinHandle<()>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Outgoing>();

        let task = tokio::spawn(async move {
            while let Some(item) = receiver.recv().await {
                match item {
                    Outgoing::Notification(notification) => {
                        let mut line = match notification.to_line() {
                            Ok(line) => line,
                            Err(e) => {
                                error!("序列化通知失败: {}", e);
                                continue;
                            }
                        };
                        line.push('\n');

                        if let Err(e) = writer.write_all(line.as_bytes()).await {
                            error!("写入通知失败: {}", e);
                            break;
                        }
                    }
                    Outgoing::Flush(done) => {
                        if let Err(e) = writer.flush().await {
                            error!("刷新输出失败: {}", e);
                        }
                        let _ = done.send(());
                    }
                }
            }
            let _ = writer.flush().await;
            debug!("通知写入任务结束");
        });

        (Self { sender }, task)
    }

    pub fn send(&self, notification: Notification) {
        if self.sender.send(Outgoing::Notification(notification)).is_err() {
            debug!("通知写入任务已结束，丢弃通知");
        }
    }

    /// 等待此前发送的所有通知写出
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(Outgoing::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}
