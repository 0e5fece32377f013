//! 产品目录向量检索
//!
//! 把产品目录嵌入为一个具名向量集合，集合不存在时创建并持久化
//! 到内部工作目录，跨会话幂等复用。检索为余弦相似度Top-K。

use anyhow::{Context, Result};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::CatalogConfig;
use crate::llm::client::LLMClient;

/// 一条产品记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ProductRecord {
    /// 参与嵌入的文本
    fn embedding_text(&self) -> String {
        format!("{}\n{}\n{}", self.name, self.description, self.tags.join(", "))
    }
}

/// 产品目录数据文件
#[derive(Debug, Deserialize)]
struct CatalogFile {
    products: Vec<ProductRecord>,
}

/// 持久化的向量集合
#[derive(Debug, Serialize, Deserialize)]
struct PersistedCollection {
    collection: String,
    /// 目录源文件内容哈希，源变更时集合重建
    source_hash: String,
    entries: Vec<PersistedEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    record: ProductRecord,
    embedding: Vec<f64>,
}

/// 一条检索命中
#[derive(Debug, Clone, Serialize)]
pub struct ProductMatch {
    pub record: ProductRecord,
    pub score: f64,
}

/// 产品目录向量索引
pub struct ProductIndex {
    collection_name: String,
    llm: LLMClient,
    entries: Vec<(ProductRecord, Vec<f64>)>,
}

impl ProductIndex {
    /// 打开或创建具名向量集合
    ///
    /// 集合以JSON形式持久化在 `{internal_path}/collections/{name}.json`，
    /// 源目录内容未变化时直接加载，否则重新嵌入并覆盖。
    pub async fn open_or_build(
        config: &CatalogConfig,
        internal_path: &Path,
        llm: LLMClient,
    ) -> Result<Self> {
        let source = std::fs::read_to_string(&config.source_path).context(format!(
            "Failed to read product catalog: {:?}",
            config.source_path
        ))?;
        let source_hash = Self::hash_content(&source);
        let collection_path = Self::collection_path(internal_path, &config.collection_name);

        if let Some(persisted) = Self::load_collection(&collection_path, &source_hash) {
            eprintln!(
                "📦 加载已有向量集合 `{}`（{}条产品）",
                config.collection_name,
                persisted.entries.len()
            );
            let entries = persisted
                .entries
                .into_iter()
                .map(|entry| (entry.record, entry.embedding))
                .collect();
            return Ok(Self {
                collection_name: config.collection_name.clone(),
                llm,
                entries,
            });
        }

        eprintln!("📦 创建向量集合 `{}`...", config.collection_name);
        let catalog: CatalogFile =
            toml::from_str(&source).context("Failed to parse product catalog")?;

        let mut entries = Vec::with_capacity(catalog.products.len());
        for record in catalog.products {
            let embedding = llm.embed_text(&record.embedding_text()).await?;
            entries.push((record, embedding));
        }

        let index = Self {
            collection_name: config.collection_name.clone(),
            llm,
            entries,
        };
        index.persist(&collection_path, &source_hash)?;
        eprintln!(
            "📦 向量集合 `{}` 已就绪（{}条产品）",
            index.collection_name,
            index.entries.len()
        );
        Ok(index)
    }

    /// 以预先计算好的向量直接组装索引（测试与进程内嵌入场景）
    pub fn from_entries(
        collection_name: impl Into<String>,
        llm: LLMClient,
        entries: Vec<(ProductRecord, Vec<f64>)>,
    ) -> Self {
        Self {
            collection_name: collection_name.into(),
            llm,
            entries,
        }
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 相似度检索
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ProductMatch>> {
        let query_embedding = self.llm.embed_text(query).await?;
        Ok(self.rank(&query_embedding, top_k))
    }

    /// 按余弦相似度降序返回Top-K
    pub fn rank(&self, query_embedding: &[f64], top_k: usize) -> Vec<ProductMatch> {
        let mut matches: Vec<ProductMatch> = self
            .entries
            .iter()
            .map(|(record, embedding)| ProductMatch {
                record: record.clone(),
                score: cosine_similarity(query_embedding, embedding),
            })
            .collect();
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(top_k);
        matches
    }

    fn hash_content(content: &str) -> String {
        let mut hasher = Md5::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn collection_path(internal_path: &Path, collection_name: &str) -> PathBuf {
        internal_path
            .join("collections")
            .join(format!("{}.json", collection_name))
    }

    fn load_collection(path: &Path, source_hash: &str) -> Option<PersistedCollection> {
        let content = std::fs::read_to_string(path).ok()?;
        let persisted: PersistedCollection = serde_json::from_str(&content).ok()?;
        if persisted.source_hash == source_hash {
            Some(persisted)
        } else {
            None
        }
    }

    fn persist(&self, path: &Path, source_hash: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let persisted = PersistedCollection {
            collection: self.collection_name.clone(),
            source_hash: source_hash.to_string(),
            entries: self
                .entries
                .iter()
                .map(|(record, embedding)| PersistedEntry {
                    record: record.clone(),
                    embedding: embedding.clone(),
                })
                .collect(),
        };
        std::fs::write(path, serde_json::to_string(&persisted)?)?;
        Ok(())
    }
}

/// 余弦相似度
fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
