//! 能力上下文 - 构建期附着到Agent上的工具/插件与执行策略
//!
//! 能力以带标签的变体建模，调用期按变体分发，而非继承体系。

use std::sync::Arc;

use crate::agents::connections::ToolConnection;
use crate::agents::remote::RemoteAgentIdentity;
use crate::catalog::ProductIndex;

/// 工具使用策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolUsePolicy {
    /// 模型自行决定是否调用工具
    Auto,
    /// 给出最终答案前必须至少调用一次所附工具
    Required,
}

/// Agent能力集
#[derive(Clone)]
pub enum Capability {
    /// 纯对话，无外部能力
    Plain,
    /// 工具增强：外部网页搜索grounding
    GroundedSearch(GroundedSearchContext),
    /// 检索增强：产品目录向量检索
    Retrieval(RetrievalContext),
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capability")
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}

impl Capability {
    pub fn kind(&self) -> &'static str {
        match self {
            Capability::Plain => "plain",
            Capability::GroundedSearch(_) => "grounded_search",
            Capability::Retrieval(_) => "retrieval",
        }
    }
}

/// grounded搜索上下文
///
/// 包装一个按众所周知名称解析出的外部搜索连接，以及构建期注册的
/// 远程Agent身份。身份在会话结束时注销。
#[derive(Clone)]
pub struct GroundedSearchContext {
    pub connection: ToolConnection,
    pub remote_identity: RemoteAgentIdentity,
    pub policy: ToolUsePolicy,
}

/// 检索上下文
///
/// 包装产品目录向量集合，以 `ProductSearchPlugin` 名义暴露给Agent。
#[derive(Clone)]
pub struct RetrievalContext {
    pub index: Arc<ProductIndex>,
    pub top_k: usize,
    pub policy: ToolUsePolicy,
}
