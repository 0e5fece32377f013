//! 远程Agent身份管理
//!
//! 工具增强Agent在构建时需要向AI项目服务注册一次远程身份。
//! 身份随会话创建而注册、随会话结束而注销，避免注册泄漏。

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ProjectConfig;

/// 远程Agent注册请求
#[derive(Debug, Clone, Serialize)]
pub struct RemoteAgentSpec {
    pub model: String,
    pub name: String,
    pub description: String,
    pub instructions: String,
    /// 该Agent绑定的工具连接名
    pub tool_connection: String,
}

/// 已注册的远程Agent身份
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RemoteAgentIdentity {
    pub id: String,
}

/// 远程Agent注册协作方接口
#[async_trait]
pub trait AgentRegistrar: Send + Sync {
    async fn register(&self, spec: &RemoteAgentSpec) -> Result<RemoteAgentIdentity>;

    async fn deregister(&self, identity: &RemoteAgentIdentity) -> Result<()>;
}

/// 基于AI项目HTTP端点的注册实现
pub struct ProjectAgentRegistrar {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ProjectAgentRegistrar {
    pub fn new(config: &ProjectConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client for agent registrar")?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl AgentRegistrar for ProjectAgentRegistrar {
    async fn register(&self, spec: &RemoteAgentSpec) -> Result<RemoteAgentIdentity> {
        let url = format!("{}/agents", self.endpoint);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(spec)
            .send()
            .await
            .context("Remote agent registration request failed")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Remote agent registration rejected with status {}",
                response.status()
            );
        }

        let identity: RemoteAgentIdentity = response
            .json()
            .await
            .context("Failed to parse remote agent identity")?;
        Ok(identity)
    }

    async fn deregister(&self, identity: &RemoteAgentIdentity) -> Result<()> {
        let url = format!("{}/agents/{}", self.endpoint, identity.id);
        let response = self
            .http
            .delete(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("Remote agent deregistration request failed")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Remote agent deregistration rejected with status {}",
                response.status()
            );
        }
        Ok(())
    }
}
