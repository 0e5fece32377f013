//! 增量响应协议 - 流式输出的线上契约
//!
//! 每条记录序列化为一行JSON并立即冲刷，调用方无需等待整个
//! 流水线完成即可观察到进度。

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// 消息角色
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeltaRole {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant")]
    Assistant,
}

/// 产出该增量的Agent标签
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentTag {
    pub name: String,
}

/// 一条消息增量
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageDelta {
    pub role: DeltaRole,
    /// 产出方标签。工具调用通告不携带标签
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<AgentTag>,
    pub content: String,
}

/// 一条完整的增量记录 - 流式输出的最小单元
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeltaRecord {
    pub delta: MessageDelta,
    /// 会话续接状态，为空时不输出
    #[serde(rename = "sessionState", skip_serializing_if = "Option::is_none")]
    pub session_state: Option<String>,
    /// 不透明的续接载荷，为空时不输出
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl DeltaRecord {
    /// 某个Agent的一个回合产出
    pub fn agent_turn(author: &str, content: impl Into<String>) -> Self {
        Self {
            delta: MessageDelta {
                role: DeltaRole::Assistant,
                context: Some(AgentTag {
                    name: author.to_string(),
                }),
                content: content.into(),
            },
            session_state: None,
            context: None,
        }
    }

    /// 工具调用通告（system角色，不携带Agent标签）
    pub fn tool_notice(function: &str, arguments: &str) -> Self {
        Self {
            delta: MessageDelta {
                role: DeltaRole::System,
                context: None,
                content: format!("{}: {}  \n", function, arguments),
            },
            session_state: None,
            context: None,
        }
    }

    /// 致命错误的终止记录，便于客户端识别异常结束
    pub fn error_terminal(message: &str) -> Self {
        Self {
            delta: MessageDelta {
                role: DeltaRole::System,
                context: None,
                content: format!("error: {}", message),
            },
            session_state: None,
            context: None,
        }
    }

    pub fn with_session_state(mut self, state: impl Into<String>) -> Self {
        self.session_state = Some(state.into());
        self
    }

    /// 序列化为一行NDJSON（含换行符）
    pub fn to_wire_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// 该记录的作者名（工具通告返回None）
    pub fn author(&self) -> Option<&str> {
        self.delta.context.as_ref().map(|tag| tag.name.as_str())
    }
}
