//! 会话错误分类
//!
//! 所有核心层失败都以终止性错误的形式上抛给调用方，已流出的
//! 增量不回收。通道写入失败视作取消而非失败。

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// 提示词模板资源缺失或格式错误，会话在任何输出前终止
    #[error("无法加载提示词模板 {path:?}: {cause}")]
    TemplateLoad { path: PathBuf, cause: anyhow::Error },

    /// 未找到指定名称的工具连接，会话在任何输出前终止
    #[error("未找到名为 `{name}` 的工具连接")]
    ConnectionNotFound { name: String },

    /// 远程Agent身份注册失败，会话在任何输出前终止
    #[error("远程Agent注册失败: {cause}")]
    RemoteAgentCreation { cause: anyhow::Error },

    /// 向量集合创建/加载失败，会话在任何输出前终止
    #[error("向量集合 `{collection}` 初始化失败: {cause}")]
    CollectionSetup {
        collection: String,
        cause: anyhow::Error,
    },

    /// 模型/工具往返在流式输出过程中失败，已流出的增量保持有效
    #[error("Agent [{agent}] 调用失败: {cause}")]
    AgentInvocation { agent: String, cause: anyhow::Error },

    /// 单回合超时
    #[error("Agent [{agent}] 回合超时（{seconds}秒）")]
    TurnTimeout { agent: String, seconds: u64 },

    /// 会话超出总截止时间
    #[error("会话超出截止时间（{seconds}秒）")]
    DeadlineExceeded { seconds: u64 },

    /// 出站通道写入失败。按取消处理：停止发起后续调用
    #[error("响应通道已关闭")]
    ChannelWrite,
}

impl SessionError {
    /// 是否应按调用方取消处理（而非会话失败）
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SessionError::ChannelWrite)
    }
}
