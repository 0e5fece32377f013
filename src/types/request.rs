use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 撰写请求 - 调用方提交的结构化写作任务
///
/// 三个字段在会话生命周期内不可变。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WriterRequest {
    /// 调研简报，作为Researcher的输入上下文
    pub research: String,
    /// 产品简报，作为Marketing检索产品目录的输入上下文
    pub products: String,
    /// 写作任务说明，作为Writer的assignment
    pub writing: String,
}

impl WriterRequest {
    pub fn new(
        research: impl Into<String>,
        products: impl Into<String>,
        writing: impl Into<String>,
    ) -> Self {
        Self {
            research: research.into(),
            products: products.into(),
            writing: writing.into(),
        }
    }

    /// 从JSON文件加载请求
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read request file: {:?}", path))?;
        Self::from_json(&content)
    }

    /// 从JSON字符串解析请求
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse writer request")
    }
}
