//! Agent能力工具集
//!
//! 每个工具在执行前通过通告通道上报一次调用事件，会话层把
//! 通告与Agent自身的产出按真实调用顺序合流到响应流。

use tokio::sync::mpsc;

pub mod product_search;
pub mod web_search;

pub use product_search::ProductSearchTool;
pub use web_search::WebSearchTool;

/// 一次工具调用的通告
#[derive(Debug, Clone, PartialEq)]
pub struct ToolNotice {
    pub function: String,
    pub arguments: String,
}

/// 工具调用通告发送端
pub type NoticeSender = mpsc::UnboundedSender<ToolNotice>;

/// 一次Agent调用可携带的工具集合
#[derive(Clone, Default)]
pub struct AgentToolSet {
    pub web_search: Option<WebSearchTool>,
    pub product_search: Option<ProductSearchTool>,
    /// 是否要求Agent在给出最终答案前至少调用一次所附工具
    pub require_tool_use: bool,
}

impl AgentToolSet {
    pub fn is_empty(&self) -> bool {
        self.web_search.is_none() && self.product_search.is_none()
    }

    /// OpenAI兼容端点的强制工具调用参数
    pub fn execution_params(&self) -> Option<serde_json::Value> {
        if self.require_tool_use && !self.is_empty() {
            Some(serde_json::json!({ "tool_choice": "required" }))
        } else {
            None
        }
    }
}
