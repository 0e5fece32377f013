//! 增量出口 - 把增量记录序列化并转发到出站通道
//!
//! 每条记录写出后立即冲刷，调用方无需等待整个流水线完成。
//! 写入失败统一映射为 `ChannelWrite`，会话层按取消处理。

use async_trait::async_trait;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::error::SessionError;
use crate::types::delta::DeltaRecord;

/// 增量出口接口
#[async_trait]
pub trait DeltaOutlet: Send {
    /// 发出一条增量记录并立即冲刷
    async fn emit(&mut self, record: &DeltaRecord) -> Result<(), SessionError>;
}

/// NDJSON出口 - 一条记录一行JSON，逐条冲刷到异步输出流
pub struct NdjsonOutlet<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> NdjsonOutlet<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> DeltaOutlet for NdjsonOutlet<W> {
    async fn emit(&mut self, record: &DeltaRecord) -> Result<(), SessionError> {
        let line = record.to_wire_line().map_err(|_| SessionError::ChannelWrite)?;
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|_| SessionError::ChannelWrite)?;
        self.writer
            .flush()
            .await
            .map_err(|_| SessionError::ChannelWrite)?;
        Ok(())
    }
}

/// 通道出口 - 把记录转发给进程内订阅者（如Web层）
pub struct ChannelOutlet {
    tx: mpsc::Sender<DeltaRecord>,
}

impl ChannelOutlet {
    /// 创建通道出口与配套的订阅流
    pub fn new(capacity: usize) -> (Self, DeltaStream) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, DeltaStream { rx })
    }
}

#[async_trait]
impl DeltaOutlet for ChannelOutlet {
    async fn emit(&mut self, record: &DeltaRecord) -> Result<(), SessionError> {
        self.tx
            .send(record.clone())
            .await
            .map_err(|_| SessionError::ChannelWrite)
    }
}

/// 增量记录订阅流
pub struct DeltaStream {
    rx: mpsc::Receiver<DeltaRecord>,
}

impl DeltaStream {
    pub async fn recv(&mut self) -> Option<DeltaRecord> {
        self.rx.recv().await
    }
}

impl futures::Stream for DeltaStream {
    type Item = DeltaRecord;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
