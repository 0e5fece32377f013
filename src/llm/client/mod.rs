//! LLM客户端 - 提供统一的LLM服务接口

use anyhow::Result;
use rig::completion::Message;
use std::future::Future;

use crate::config::Config;
use crate::llm::tools::AgentToolSet;

mod providers;

use providers::ProviderClient;

/// LLM客户端 - 提供统一的LLM服务接口
#[derive(Clone)]
pub struct LLMClient {
    config: Config,
    client: ProviderClient,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: Config) -> Result<Self> {
        let client = ProviderClient::new(&config.llm)?;
        Ok(Self { client, config })
    }

    /// 检查模型连接和功能是否正常
    pub async fn check_connection(&self) -> Result<()> {
        eprintln!("🔄 正在检查模型连接...");
        match self
            .prompt_once("System: You are a helpful assistant.", "Hello")
            .await
        {
            Ok(_) => {
                eprintln!("✅ 模型连接正常");
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ 模型连接失败: {}", e);
                Err(e)
            }
        }
    }

    /// 通用重试逻辑，用于处理异步操作的重试机制
    async fn retry_with_backoff<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, anyhow::Error>>,
    {
        let llm_config = &self.config.llm;
        let max_retries = llm_config.retry_attempts;
        let retry_delay_ms = llm_config.retry_delay_ms;
        let mut retries = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    retries += 1;
                    eprintln!(
                        "❌ 调用模型服务出错，重试中 (第 {} / {}次尝试): {}",
                        retries, max_retries, err
                    );
                    if retries >= max_retries {
                        return Err(err);
                    }
                    tokio::time::sleep(std::time::Duration::from_millis(retry_delay_ms)).await;
                }
            }
        }
    }

    /// 单轮对话（不携带历史与工具）
    pub async fn prompt_once(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let agent = self.client.create_agent(
            &self.config.llm.model,
            system_prompt,
            &self.config.llm,
            &AgentToolSet::default(),
        );

        self.retry_with_backoff(|| async { agent.prompt(user_prompt).await })
            .await
    }

    /// 携带对话历史的一轮对话（Writer/Editor评审循环使用）
    pub async fn chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        history: Vec<Message>,
    ) -> Result<String> {
        let agent = self.client.create_agent(
            &self.config.llm.model,
            system_prompt,
            &self.config.llm,
            &AgentToolSet::default(),
        );

        self.retry_with_backoff(|| async { agent.chat(user_prompt, history.clone()).await })
            .await
    }

    /// 工具增强的一次调用，允许多轮工具往返后给出最终答案
    pub async fn invoke_with_tools(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        tools: &AgentToolSet,
    ) -> Result<String> {
        let agent = self.client.create_agent(
            &self.config.llm.model,
            system_prompt,
            &self.config.llm,
            tools,
        );
        let max_iterations = self.config.llm.max_tool_iterations;

        self.retry_with_backoff(|| async {
            agent
                .multi_turn(user_prompt, max_iterations)
                .await
                .map_err(|e| anyhow::anyhow!("工具增强调用失败: {}", e))
        })
        .await
    }

    /// 嵌入一段文本
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f64>> {
        let model = self
            .client
            .create_embedding_model(&self.config.llm.embedding_model)?;

        self.retry_with_backoff(|| async { model.embed_text(text).await })
            .await
    }
}
