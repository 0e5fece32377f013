use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::config::{Config, LLMProvider};
use crate::types::request::WriterRequest;

/// Penflow-RS - 由Rust与AI驱动的多Agent创作引擎
#[derive(Parser, Debug)]
#[command(name = "Penflow (penflow-rs)")]
#[command(
    about = "AI-based multi-agent creative writing engine. It orchestrates Researcher, Marketing, Writer and Editor agents and streams the article generation progress as incremental NDJSON deltas."
)]
#[command(author = "Sopaco")]
#[command(version)]
pub struct Args {
    /// 调研简报
    #[arg(long)]
    pub research: Option<String>,

    /// 产品简报
    #[arg(long)]
    pub products: Option<String>,

    /// 写作任务说明
    #[arg(long)]
    pub writing: Option<String>,

    /// 请求JSON文件路径（与上面三个单项参数二选一）
    #[arg(short, long)]
    pub request: Option<PathBuf>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 提示词模板目录
    #[arg(long)]
    pub prompts_dir: Option<PathBuf>,

    /// LLM Provider (openai, moonshot, deepseek, mistral, openrouter, anthropic, gemini, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 对话模型
    #[arg(long)]
    pub model: Option<String>,

    /// 嵌入模型
    #[arg(long)]
    pub embedding_model: Option<String>,

    /// 最大tokens数
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// 评审回合数上限
    #[arg(long)]
    pub max_review_turns: Option<u32>,

    /// 单回合超时时间（秒）
    #[arg(long)]
    pub turn_timeout: Option<u64>,

    /// 会话总截止时间（秒）
    #[arg(long)]
    pub deadline: Option<u64>,

    /// 跳过启动时的模型连接检查
    #[arg(long)]
    pub skip_connection_check: bool,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 从CLI参数构建撰写请求
    pub fn writer_request(&self) -> Result<WriterRequest> {
        if let Some(path) = &self.request {
            return WriterRequest::from_file(path);
        }

        match (&self.research, &self.products, &self.writing) {
            (Some(research), Some(products), Some(writing)) => {
                Ok(WriterRequest::new(research, products, writing))
            }
            _ => anyhow::bail!(
                "必须提供 --request <file>，或同时提供 --research / --products / --writing"
            ),
        }
    }

    /// 将CLI参数转换为配置
    pub fn into_config(self) -> Config {
        let mut config = if let Some(config_path) = &self.config {
            // 如果显式指定了配置文件路径，从该路径加载
            Config::from_file(config_path).unwrap_or_else(|_| {
                panic!("⚠️ 警告: 无法读取配置文件 {:?}", config_path)
            })
        } else {
            // 如果没有显式指定配置文件，尝试从默认位置加载
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| std::path::PathBuf::from("."))
                .join("penflow.toml");

            if default_config_path.exists() {
                Config::from_file(&default_config_path).unwrap_or_else(|_| {
                    panic!(
                        "⚠️ 警告: 无法读取默认配置文件 {:?}",
                        default_config_path
                    )
                })
            } else {
                // 默认配置文件不存在，使用默认值
                Config::default()
            }
        };

        if let Some(prompts_dir) = self.prompts_dir {
            config.prompts_dir = prompts_dir;
        }

        // 覆盖LLM配置
        if let Some(provider_str) = self.llm_provider {
            if let Ok(provider) = provider_str.parse::<LLMProvider>() {
                config.llm.provider = provider;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的provider: {}，使用默认provider",
                    provider_str
                );
            }
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(model) = self.model {
            config.llm.model = model;
        }
        if let Some(embedding_model) = self.embedding_model {
            config.llm.embedding_model = embedding_model;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }

        // 会话限制
        if let Some(max_review_turns) = self.max_review_turns {
            config.session.max_review_turns = max_review_turns;
        }
        if let Some(turn_timeout) = self.turn_timeout {
            config.session.turn_timeout_seconds = turn_timeout;
        }
        if let Some(deadline) = self.deadline {
            config.session.deadline_seconds = deadline;
        }

        // 其他配置
        if self.skip_connection_check {
            config.skip_connection_check = true;
        }
        if self.verbose {
            config.verbose = true;
        }

        config
    }
}

// Include tests
#[cfg(test)]
mod tests;
