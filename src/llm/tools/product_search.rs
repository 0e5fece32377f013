//! 产品目录检索插件 - Marketing的检索增强能力

use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::ProductIndex;
use crate::llm::tools::{NoticeSender, ToolNotice};

/// 产品检索工具，以 `ProductSearchPlugin` 名义暴露给Agent
#[derive(Clone)]
pub struct ProductSearchTool {
    index: Arc<ProductIndex>,
    top_k: usize,
    notices: NoticeSender,
}

/// 检索参数
#[derive(Debug, Serialize, Deserialize)]
pub struct ProductSearchArgs {
    pub query: String,
}

/// 单条检索命中
#[derive(Debug, Serialize)]
pub struct ProductSearchHit {
    pub name: String,
    pub description: String,
    pub score: f64,
}

/// 检索结果集
#[derive(Debug, Serialize)]
pub struct ProductSearchResults {
    pub results: Vec<ProductSearchHit>,
}

/// 检索工具错误
#[derive(Debug, thiserror::Error)]
#[error("Product search failed: {0}")]
pub struct ProductSearchError(String);

impl ProductSearchTool {
    pub fn new(index: Arc<ProductIndex>, top_k: usize, notices: NoticeSender) -> Self {
        Self {
            index,
            top_k,
            notices,
        }
    }
}

impl Tool for ProductSearchTool {
    const NAME: &'static str = "ProductSearchPlugin";

    type Error = ProductSearchError;
    type Args = ProductSearchArgs;
    type Output = ProductSearchResults;

    async fn definition(&self, _prompt: String) -> rig::completion::ToolDefinition {
        rig::completion::ToolDefinition {
            name: Self::NAME.to_string(),
            description: "在产品目录中进行语义检索，返回与查询最相关的产品信息。".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "检索查询，描述想要查找的产品特征"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        eprintln!("   🔧 tool called...ProductSearchPlugin@{:?}", args.query);

        let _ = self.notices.send(ToolNotice {
            function: Self::NAME.to_string(),
            arguments: serde_json::to_string(&args).unwrap_or_default(),
        });

        let matches = self
            .index
            .search(&args.query, self.top_k)
            .await
            .map_err(|e| ProductSearchError(e.to_string()))?;

        Ok(ProductSearchResults {
            results: matches
                .into_iter()
                .map(|m| ProductSearchHit {
                    name: m.record.name,
                    description: m.record.description,
                    score: m.score,
                })
                .collect(),
        })
    }
}
