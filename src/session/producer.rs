//! 模型调用协作方 - 惰性回合序列的生产者
//!
//! 一次 `produce` 对应一次Agent调用；产出的每个回合经由有界通道
//! 流出，会话层在通道另一端把回合与工具通告合流到响应流。

use anyhow::Result;
use async_trait::async_trait;
use rig::completion::Message;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::agents::capability::{Capability, ToolUsePolicy};
use crate::agents::CreativeAgent;
use crate::llm::client::LLMClient;
use crate::llm::tools::{AgentToolSet, NoticeSender, ProductSearchTool, WebSearchTool};
use crate::session::transcript::Turn;

/// 模型调用协作方接口
#[async_trait]
pub trait TurnProducer: Send + Sync {
    /// 执行一次Agent调用，把产出的回合逐个发送到 `turns`
    ///
    /// 发送失败（接收端已放弃）不算错误：调用方已不再需要结果。
    async fn produce(
        &self,
        agent: &CreativeAgent,
        history: &[Turn],
        turns: mpsc::Sender<String>,
    ) -> Result<()>;
}

/// 基于LLM客户端的生产者实现
pub struct LlmTurnProducer {
    llm: LLMClient,
    notices: NoticeSender,
}

impl LlmTurnProducer {
    pub fn new(llm: LLMClient, notices: NoticeSender) -> Self {
        Self { llm, notices }
    }

    /// 按能力变体装配本次调用的工具集
    fn toolset_for(&self, capability: &Capability) -> AgentToolSet {
        match capability {
            Capability::Plain => AgentToolSet::default(),
            Capability::GroundedSearch(context) => AgentToolSet {
                web_search: Some(WebSearchTool::new(
                    context.connection.clone(),
                    self.notices.clone(),
                )),
                product_search: None,
                require_tool_use: context.policy == ToolUsePolicy::Required,
            },
            Capability::Retrieval(context) => AgentToolSet {
                web_search: None,
                product_search: Some(ProductSearchTool::new(
                    Arc::clone(&context.index),
                    context.top_k,
                    self.notices.clone(),
                )),
                require_tool_use: context.policy == ToolUsePolicy::Required,
            },
        }
    }

    /// 把回合历史拆成（本轮输入，历史消息）
    ///
    /// 最新一个回合（对方的产出）作为本轮输入，其余回合按视角映射：
    /// 本Agent的回合为assistant消息，其余为user消息。
    fn split_history(agent_name: &str, history: &[Turn]) -> (String, Vec<Message>) {
        let Some((latest, earlier)) = history.split_last() else {
            return (String::new(), Vec::new());
        };
        let messages = earlier
            .iter()
            .map(|turn| {
                if turn.author == agent_name {
                    Message::assistant(&turn.content)
                } else {
                    Message::user(&turn.content)
                }
            })
            .collect();
        (latest.content.clone(), messages)
    }
}

#[async_trait]
impl TurnProducer for LlmTurnProducer {
    async fn produce(
        &self,
        agent: &CreativeAgent,
        history: &[Turn],
        turns: mpsc::Sender<String>,
    ) -> Result<()> {
        let instructions = agent.instructions();
        let toolset = self.toolset_for(&agent.capability);

        let content = if history.is_empty() {
            let kickoff = agent.kickoff();
            if toolset.is_empty() {
                self.llm.chat(&instructions, &kickoff, Vec::new()).await?
            } else {
                self.llm
                    .invoke_with_tools(&instructions, &kickoff, &toolset)
                    .await?
            }
        } else {
            let (prompt, messages) = Self::split_history(agent.name, history);
            self.llm.chat(&instructions, &prompt, messages).await?
        };

        let _ = turns.send(content).await;
        Ok(())
    }
}
