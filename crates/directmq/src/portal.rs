/// 传输抽象
///
/// Portal 是两个节点之间的双向数据包通道，写入不能阻塞

use crate::errors::Result;

pub trait Portal: Send + Sync {
    /// 写入一个数据包，连接已关闭时返回错误
    fn write_packet(&self, packet: Vec<u8>) -> Result<()>;

    /// 关闭连接，重复关闭无副作用
    fn close(&self) -> Result<()>;
}
