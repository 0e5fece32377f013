//! LLM Provider支持模块

use anyhow::Result;
use rig::{
    agent::Agent,
    client::{CompletionClient, EmbeddingsClient},
    completion::{Chat, Message, Prompt, PromptError},
    providers::gemini::completion::gemini_api_types::{AdditionalParameters, GenerationConfig},
};

use crate::{
    config::{LLMConfig, LLMProvider},
    llm::tools::AgentToolSet,
};

/// 统一的Provider客户端枚举
#[derive(Clone)]
pub enum ProviderClient {
    OpenAI(rig::providers::openai::Client),
    Moonshot(rig::providers::moonshot::Client),
    DeepSeek(rig::providers::deepseek::Client),
    Mistral(rig::providers::mistral::Client),
    OpenRouter(rig::providers::openrouter::Client),
    Anthropic(rig::providers::anthropic::Client),
    Gemini(rig::providers::gemini::Client),
    Ollama(rig::providers::ollama::Client),
}

impl ProviderClient {
    /// 根据配置创建相应的provider客户端
    pub fn new(config: &LLMConfig) -> Result<Self> {
        match config.provider {
            LLMProvider::OpenAI => {
                let client = rig::providers::openai::Client::builder(&config.api_key)
                    .base_url(&config.api_base_url)
                    .build();
                Ok(ProviderClient::OpenAI(client))
            }
            LLMProvider::Moonshot => {
                let client = rig::providers::moonshot::Client::builder(&config.api_key)
                    .base_url(&config.api_base_url)
                    .build();
                Ok(ProviderClient::Moonshot(client))
            }
            LLMProvider::DeepSeek => {
                let client = rig::providers::deepseek::Client::builder(&config.api_key)
                    .base_url(&config.api_base_url)
                    .build();
                Ok(ProviderClient::DeepSeek(client))
            }
            LLMProvider::Mistral => {
                let client = rig::providers::mistral::Client::builder(&config.api_key).build();
                Ok(ProviderClient::Mistral(client))
            }
            LLMProvider::OpenRouter => {
                let client = rig::providers::openrouter::Client::builder(&config.api_key).build();
                Ok(ProviderClient::OpenRouter(client))
            }
            LLMProvider::Anthropic => {
                let client =
                    rig::providers::anthropic::ClientBuilder::new(&config.api_key).build()?;
                Ok(ProviderClient::Anthropic(client))
            }
            LLMProvider::Gemini => {
                let client = rig::providers::gemini::Client::builder(&config.api_key).build()?;
                Ok(ProviderClient::Gemini(client))
            }
            LLMProvider::Ollama => {
                let client = rig::providers::ollama::Client::builder().build();
                Ok(ProviderClient::Ollama(client))
            }
        }
    }

    /// Provider名称
    pub fn name(&self) -> &'static str {
        match self {
            ProviderClient::OpenAI(_) => "openai",
            ProviderClient::Moonshot(_) => "moonshot",
            ProviderClient::DeepSeek(_) => "deepseek",
            ProviderClient::Mistral(_) => "mistral",
            ProviderClient::OpenRouter(_) => "openrouter",
            ProviderClient::Anthropic(_) => "anthropic",
            ProviderClient::Gemini(_) => "gemini",
            ProviderClient::Ollama(_) => "ollama",
        }
    }

    /// 创建Agent，按需挂载能力工具
    ///
    /// 强制工具调用策略仅对OpenAI兼容端点生效（经由tool_choice参数）。
    pub fn create_agent(
        &self,
        model: &str,
        system_prompt: &str,
        config: &LLMConfig,
        tools: &AgentToolSet,
    ) -> ProviderAgent {
        match self {
            ProviderClient::OpenAI(client) => {
                let mut builder = rig::agent::AgentBuilderSimple::new(
                    client.completion_model(model).completions_api(),
                )
                    .preamble(system_prompt)
                    .max_tokens(config.max_tokens.into())
                    .temperature(config.temperature);
                if let Some(tool) = &tools.web_search {
                    builder = builder.tool(tool.clone());
                }
                if let Some(tool) = &tools.product_search {
                    builder = builder.tool(tool.clone());
                }
                if let Some(params) = tools.execution_params() {
                    builder = builder.additional_params(params);
                }
                ProviderAgent::OpenAI(builder.build())
            }
            ProviderClient::Moonshot(client) => {
                let mut builder = rig::agent::AgentBuilderSimple::new(client.completion_model(model))
                    .preamble(system_prompt)
                    .max_tokens(config.max_tokens.into())
                    .temperature(config.temperature);
                if let Some(tool) = &tools.web_search {
                    builder = builder.tool(tool.clone());
                }
                if let Some(tool) = &tools.product_search {
                    builder = builder.tool(tool.clone());
                }
                if let Some(params) = tools.execution_params() {
                    builder = builder.additional_params(params);
                }
                ProviderAgent::Moonshot(builder.build())
            }
            ProviderClient::DeepSeek(client) => {
                let mut builder = rig::agent::AgentBuilderSimple::new(client.completion_model(model))
                    .preamble(system_prompt)
                    .max_tokens(config.max_tokens.into())
                    .temperature(config.temperature);
                if let Some(tool) = &tools.web_search {
                    builder = builder.tool(tool.clone());
                }
                if let Some(tool) = &tools.product_search {
                    builder = builder.tool(tool.clone());
                }
                if let Some(params) = tools.execution_params() {
                    builder = builder.additional_params(params);
                }
                ProviderAgent::DeepSeek(builder.build())
            }
            ProviderClient::Mistral(client) => {
                let mut builder = rig::agent::AgentBuilderSimple::new(client.completion_model(model))
                    .preamble(system_prompt)
                    .temperature(config.temperature);
                if let Some(tool) = &tools.web_search {
                    builder = builder.tool(tool.clone());
                }
                if let Some(tool) = &tools.product_search {
                    builder = builder.tool(tool.clone());
                }
                ProviderAgent::Mistral(builder.build())
            }
            ProviderClient::OpenRouter(client) => {
                let mut builder = rig::agent::AgentBuilderSimple::new(client.completion_model(model))
                    .preamble(system_prompt)
                    .temperature(config.temperature);
                if let Some(tool) = &tools.web_search {
                    builder = builder.tool(tool.clone());
                }
                if let Some(tool) = &tools.product_search {
                    builder = builder.tool(tool.clone());
                }
                if let Some(params) = tools.execution_params() {
                    builder = builder.additional_params(params);
                }
                ProviderAgent::OpenRouter(builder.build())
            }
            ProviderClient::Anthropic(client) => {
                let mut builder = rig::agent::AgentBuilderSimple::new(client.completion_model(model))
                    .preamble(system_prompt)
                    .max_tokens(config.max_tokens.into())
                    .temperature(config.temperature);
                if let Some(tool) = &tools.web_search {
                    builder = builder.tool(tool.clone());
                }
                if let Some(tool) = &tools.product_search {
                    builder = builder.tool(tool.clone());
                }
                ProviderAgent::Anthropic(builder.build())
            }
            ProviderClient::Gemini(client) => {
                let gen_cfg = GenerationConfig::default();
                let cfg = AdditionalParameters::default().with_config(gen_cfg);

                let mut builder = rig::agent::AgentBuilderSimple::new(client.completion_model(model))
                    .preamble(system_prompt)
                    .max_tokens(config.max_tokens.into())
                    .temperature(config.temperature)
                    .additional_params(serde_json::to_value(cfg).unwrap());
                if let Some(tool) = &tools.web_search {
                    builder = builder.tool(tool.clone());
                }
                if let Some(tool) = &tools.product_search {
                    builder = builder.tool(tool.clone());
                }
                ProviderAgent::Gemini(builder.build())
            }
            ProviderClient::Ollama(client) => {
                let mut builder = rig::agent::AgentBuilderSimple::new(client.completion_model(model))
                    .preamble(system_prompt)
                    .max_tokens(config.max_tokens.into())
                    .temperature(config.temperature);
                if let Some(tool) = &tools.web_search {
                    builder = builder.tool(tool.clone());
                }
                if let Some(tool) = &tools.product_search {
                    builder = builder.tool(tool.clone());
                }
                ProviderAgent::Ollama(builder.build())
            }
        }
    }

    /// 创建嵌入模型
    ///
    /// 目前经由openai兼容端点提供嵌入能力，其余provider暂不支持。
    pub fn create_embedding_model(&self, model: &str) -> Result<ProviderEmbeddingModel> {
        match self {
            ProviderClient::OpenAI(client) => Ok(ProviderEmbeddingModel::OpenAI(
                client.embedding_model(model),
            )),
            other => anyhow::bail!(
                "provider `{}` 不支持嵌入模型，产品目录检索请使用openai兼容端点",
                other.name()
            ),
        }
    }
}

/// 统一的Agent枚举
pub enum ProviderAgent {
    OpenAI(Agent<rig::providers::openai::CompletionModel>),
    Mistral(Agent<rig::providers::mistral::CompletionModel>),
    OpenRouter(Agent<rig::providers::openrouter::CompletionModel>),
    Anthropic(Agent<rig::providers::anthropic::completion::CompletionModel>),
    Gemini(Agent<rig::providers::gemini::completion::CompletionModel>),
    Moonshot(Agent<rig::providers::moonshot::CompletionModel>),
    DeepSeek(Agent<rig::providers::deepseek::CompletionModel>),
    Ollama(Agent<rig::providers::ollama::CompletionModel<reqwest::Client>>),
}

impl ProviderAgent {
    /// 执行prompt
    pub async fn prompt(&self, prompt: &str) -> Result<String> {
        match self {
            ProviderAgent::OpenAI(agent) => agent.prompt(prompt).await.map_err(|e| e.into()),
            ProviderAgent::Moonshot(agent) => agent.prompt(prompt).await.map_err(|e| e.into()),
            ProviderAgent::DeepSeek(agent) => agent.prompt(prompt).await.map_err(|e| e.into()),
            ProviderAgent::Mistral(agent) => agent.prompt(prompt).await.map_err(|e| e.into()),
            ProviderAgent::OpenRouter(agent) => agent.prompt(prompt).await.map_err(|e| e.into()),
            ProviderAgent::Anthropic(agent) => agent.prompt(prompt).await.map_err(|e| e.into()),
            ProviderAgent::Gemini(agent) => agent.prompt(prompt).await.map_err(|e| e.into()),
            ProviderAgent::Ollama(agent) => agent.prompt(prompt).await.map_err(|e| e.into()),
        }
    }

    /// 携带对话历史执行一轮对话
    pub async fn chat(&self, prompt: &str, history: Vec<Message>) -> Result<String> {
        match self {
            ProviderAgent::OpenAI(agent) => agent.chat(prompt, history).await.map_err(|e| e.into()),
            ProviderAgent::Moonshot(agent) => {
                agent.chat(prompt, history).await.map_err(|e| e.into())
            }
            ProviderAgent::DeepSeek(agent) => {
                agent.chat(prompt, history).await.map_err(|e| e.into())
            }
            ProviderAgent::Mistral(agent) => {
                agent.chat(prompt, history).await.map_err(|e| e.into())
            }
            ProviderAgent::OpenRouter(agent) => {
                agent.chat(prompt, history).await.map_err(|e| e.into())
            }
            ProviderAgent::Anthropic(agent) => {
                agent.chat(prompt, history).await.map_err(|e| e.into())
            }
            ProviderAgent::Gemini(agent) => agent.chat(prompt, history).await.map_err(|e| e.into()),
            ProviderAgent::Ollama(agent) => agent.chat(prompt, history).await.map_err(|e| e.into()),
        }
    }

    /// 执行多轮对话（允许工具调用往返）
    pub async fn multi_turn(
        &self,
        prompt: &str,
        max_iterations: usize,
    ) -> Result<String, PromptError> {
        match self {
            ProviderAgent::OpenAI(agent) => agent.prompt(prompt).multi_turn(max_iterations).await,
            ProviderAgent::Moonshot(agent) => agent.prompt(prompt).multi_turn(max_iterations).await,
            ProviderAgent::DeepSeek(agent) => agent.prompt(prompt).multi_turn(max_iterations).await,
            ProviderAgent::Mistral(agent) => agent.prompt(prompt).multi_turn(max_iterations).await,
            ProviderAgent::OpenRouter(agent) => {
                agent.prompt(prompt).multi_turn(max_iterations).await
            }
            ProviderAgent::Anthropic(agent) => {
                agent.prompt(prompt).multi_turn(max_iterations).await
            }
            ProviderAgent::Gemini(agent) => agent.prompt(prompt).multi_turn(max_iterations).await,
            ProviderAgent::Ollama(agent) => agent.prompt(prompt).multi_turn(max_iterations).await,
        }
    }
}

/// 统一的嵌入模型枚举
#[derive(Clone)]
pub enum ProviderEmbeddingModel {
    OpenAI(rig::providers::openai::EmbeddingModel),
}

impl ProviderEmbeddingModel {
    /// 嵌入一段文本
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f64>> {
        match self {
            ProviderEmbeddingModel::OpenAI(model) => {
                use rig::embeddings::EmbeddingModel as _;
                let mut embeddings = model.embed_texts(vec![text.to_string()]).await?;
                embeddings
                    .pop()
                    .map(|embedding| embedding.vec)
                    .ok_or_else(|| anyhow::anyhow!("嵌入服务未返回向量"))
            }
        }
    }
}
