//! 网页搜索工具 - Researcher的grounding能力
//!
//! 通过具名工具连接（如 `bingGrounding`）调用外部搜索服务。

use rig::tool::Tool;
use serde::{Deserialize, Serialize};

use crate::agents::connections::ToolConnection;
use crate::llm::tools::{NoticeSender, ToolNotice};

/// 网页搜索工具
#[derive(Clone)]
pub struct WebSearchTool {
    connection: ToolConnection,
    http: reqwest::Client,
    notices: NoticeSender,
}

/// 搜索参数
#[derive(Debug, Serialize, Deserialize)]
pub struct WebSearchArgs {
    pub query: String,
    /// 返回的结果条数（默认5，最多10）
    pub count: Option<u8>,
}

/// 单条搜索结果
#[derive(Debug, Serialize, Deserialize)]
pub struct WebSearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// 搜索结果集
#[derive(Debug, Serialize)]
pub struct WebSearchResults {
    pub results: Vec<WebSearchHit>,
}

/// 搜索服务返回的原始响应
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "webPages")]
    web_pages: Option<SearchPageSet>,
}

#[derive(Debug, Deserialize)]
struct SearchPageSet {
    value: Vec<SearchPage>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    name: String,
    url: String,
    snippet: String,
}

/// 搜索工具错误
#[derive(Debug, thiserror::Error)]
#[error("Web search failed: {0}")]
pub struct WebSearchError(String);

impl WebSearchTool {
    pub fn new(connection: ToolConnection, notices: NoticeSender) -> Self {
        Self {
            connection,
            http: reqwest::Client::new(),
            notices,
        }
    }

    async fn search(&self, args: &WebSearchArgs) -> Result<WebSearchResults, WebSearchError> {
        let count = args.count.unwrap_or(5).min(10);
        let response = self
            .http
            .get(&self.connection.endpoint)
            .header("Ocp-Apim-Subscription-Key", &self.connection.api_key)
            .query(&[("q", args.query.as_str()), ("count", &count.to_string())])
            .send()
            .await
            .map_err(|e| WebSearchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WebSearchError(format!(
                "search service returned {}",
                response.status()
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| WebSearchError(e.to_string()))?;

        let results = parsed
            .web_pages
            .map(|pages| {
                pages
                    .value
                    .into_iter()
                    .map(|page| WebSearchHit {
                        title: page.name,
                        url: page.url,
                        snippet: page.snippet,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(WebSearchResults { results })
    }
}

impl Tool for WebSearchTool {
    const NAME: &'static str = "web_search";

    type Error = WebSearchError;
    type Args = WebSearchArgs;
    type Output = WebSearchResults;

    async fn definition(&self, _prompt: String) -> rig::completion::ToolDefinition {
        rig::completion::ToolDefinition {
            name: Self::NAME.to_string(),
            description: "搜索互联网网页，返回标题、链接与摘要。用于获取时效性信息与事实依据。"
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "搜索关键词"
                    },
                    "count": {
                        "type": "integer",
                        "description": "返回的结果条数（默认5，最多10）"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        eprintln!("   🔧 tool called...web_search@{:?}", args.query);

        let _ = self.notices.send(ToolNotice {
            function: Self::NAME.to_string(),
            arguments: serde_json::to_string(&args).unwrap_or_default(),
        });

        self.search(&args).await
    }
}
