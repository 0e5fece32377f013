use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "moonshot")]
    Moonshot,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "mistral")]
    Mistral,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Moonshot => write!(f, "moonshot"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::Mistral => write!(f, "mistral"),
            LLMProvider::OpenRouter => write!(f, "openrouter"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Gemini => write!(f, "gemini"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "moonshot" => Ok(LLMProvider::Moonshot),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "mistral" => Ok(LLMProvider::Mistral),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "gemini" => Ok(LLMProvider::Gemini),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 提示词模板目录
    pub prompts_dir: PathBuf,

    /// 内部工作目录路径 (.penflow)，用于持久化向量集合
    pub internal_path: PathBuf,

    /// 启动时是否跳过模型连接检查
    pub skip_connection_check: bool,

    /// 是否启用详细日志
    pub verbose: bool,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// AI项目配置（远程Agent注册端点）
    pub project: ProjectConfig,

    /// 具名工具连接表，键为连接名（如 bingGrounding）
    pub connections: HashMap<String, ConnectionConfig>,

    /// 产品目录检索配置
    pub catalog: CatalogConfig,

    /// 会话执行限制
    pub session: SessionLimits,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址
    pub api_base_url: String,

    /// 对话模型
    pub model: String,

    /// 嵌入模型，用于产品目录的向量检索
    pub embedding_model: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 重试次数
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 超时时间（秒）
    pub timeout_seconds: u64,

    /// 工具增强Agent的最大工具调用轮数
    pub max_tool_iterations: usize,
}

/// AI项目配置 - 工具增强Agent的远程身份注册端点
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct ProjectConfig {
    /// 远程Agent注册服务地址
    pub endpoint: String,

    /// 注册服务凭据
    pub api_key: String,
}

/// 单个具名工具连接
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct ConnectionConfig {
    /// 工具服务地址
    pub endpoint: String,

    /// 工具服务凭据
    pub api_key: String,
}

/// 产品目录检索配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CatalogConfig {
    /// 向量集合名称（跨会话共享，不存在时创建）
    pub collection_name: String,

    /// 产品目录数据文件路径
    pub source_path: PathBuf,

    /// 相似度检索返回的条目数
    pub top_k: usize,
}

/// 会话执行限制
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SessionLimits {
    /// Writer/Editor评审回合数上限，防止Editor永不接受导致的无界循环
    pub max_review_turns: u32,

    /// 单回合超时时间（秒）
    pub turn_timeout_seconds: u64,

    /// 会话总截止时间（秒）
    pub deadline_seconds: u64,

    /// Researcher使用的具名搜索连接
    pub research_connection: String,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompts_dir: PathBuf::from("./prompts"),
            internal_path: PathBuf::from("./.penflow"),
            skip_connection_check: false,
            verbose: false,
            llm: LLMConfig::default(),
            project: ProjectConfig::default(),
            connections: HashMap::new(),
            catalog: CatalogConfig::default(),
            session: SessionLimits::default(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: std::env::var("PENFLOW_LLM_API_KEY").unwrap_or_default(),
            api_base_url: String::from("https://api-inference.modelscope.cn/v1"),
            model: String::from("Qwen/Qwen3-Next-80B-A3B-Instruct"),
            embedding_model: String::from("text-embedding-3-small"),
            max_tokens: 32768,
            temperature: 0.7,
            retry_attempts: 5,
            retry_delay_ms: 5000,
            timeout_seconds: 300,
            max_tool_iterations: 6,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            collection_name: String::from("products"),
            source_path: PathBuf::from("./catalog/products.toml"),
            top_k: 3,
        }
    }
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_review_turns: 8,
            turn_timeout_seconds: 120,
            deadline_seconds: 900,
            research_connection: String::from("bingGrounding"),
        }
    }
}
