//! Agent工厂 - 按角色构建四个创作Agent
//!
//! 给定角色名、提示词模板与能力上下文，产出绑定完成的Agent。
//! 除工具增强Agent需要一次性的远程身份注册外，构建过程没有
//! 其他副作用。

use std::sync::Arc;

use crate::agents::capability::{
    Capability, GroundedSearchContext, RetrievalContext, ToolUsePolicy,
};
use crate::agents::connections::ConnectionRegistry;
use crate::agents::remote::{AgentRegistrar, RemoteAgentSpec};
use crate::agents::template::PromptTemplate;
use crate::agents::{
    CreativeAgent, EDITOR_NAME, MARKETING_NAME, RESEARCHER_NAME, WRITER_NAME,
};
use crate::catalog::ProductIndex;
use crate::config::Config;
use crate::error::SessionError;

/// Agent工厂
pub struct AgentFactory<'a> {
    config: &'a Config,
}

impl<'a> AgentFactory<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    fn load_template(&self, file_name: &str) -> Result<PromptTemplate, SessionError> {
        PromptTemplate::from_file(&self.config.prompts_dir.join(file_name))
    }

    /// 构建Researcher - 工具增强（grounded搜索）
    ///
    /// 解析具名搜索连接并注册远程Agent身份，二者任一失败都会在
    /// 任何输出产生前中止会话。
    pub async fn create_researcher(
        &self,
        connections: &ConnectionRegistry,
        registrar: &dyn AgentRegistrar,
    ) -> Result<CreativeAgent, SessionError> {
        let connection = connections.resolve(&self.config.session.research_connection)?;
        let template = self.load_template("researcher.toml")?;

        let spec = RemoteAgentSpec {
            model: self.config.llm.model.clone(),
            name: template.name.clone(),
            description: template.description.clone(),
            instructions: template.template.clone(),
            tool_connection: connection.name.clone(),
        };
        let remote_identity = registrar
            .register(&spec)
            .await
            .map_err(|cause| SessionError::RemoteAgentCreation { cause })?;

        Ok(CreativeAgent::new(
            RESEARCHER_NAME,
            template,
            Capability::GroundedSearch(GroundedSearchContext {
                connection,
                remote_identity,
                policy: ToolUsePolicy::Required,
            }),
        ))
    }

    /// 构建Marketing - 检索增强（产品目录向量检索）
    pub fn create_marketing(
        &self,
        index: Arc<ProductIndex>,
    ) -> Result<CreativeAgent, SessionError> {
        let template = self.load_template("marketing.toml")?;
        Ok(CreativeAgent::new(
            MARKETING_NAME,
            template,
            Capability::Retrieval(RetrievalContext {
                index,
                top_k: self.config.catalog.top_k,
                policy: ToolUsePolicy::Required,
            }),
        ))
    }

    /// 构建Writer - 纯对话
    pub fn create_writer(&self) -> Result<CreativeAgent, SessionError> {
        let template = self.load_template("writer.toml")?;
        Ok(CreativeAgent::new(WRITER_NAME, template, Capability::Plain))
    }

    /// 构建Editor - 纯对话
    pub fn create_editor(&self) -> Result<CreativeAgent, SessionError> {
        let template = self.load_template("editor.toml")?;
        Ok(CreativeAgent::new(EDITOR_NAME, template, Capability::Plain))
    }
}
