//! 四个创作角色Agent的构建与表示

use std::collections::HashMap;

use crate::agents::capability::Capability;
use crate::agents::template::PromptTemplate;

pub mod capability;
pub mod connections;
pub mod factory;
pub mod remote;
pub mod template;

pub use factory::AgentFactory;

/// 角色标识，用于增量路由与终止判定
pub const RESEARCHER_NAME: &str = "Researcher";
pub const MARKETING_NAME: &str = "Marketing";
pub const WRITER_NAME: &str = "Writer";
pub const EDITOR_NAME: &str = "Editor";

/// 一个创作Agent实例
///
/// 每个会话创建一次，首次调用后除参数绑定外不再变更。
#[derive(Clone, Debug)]
pub struct CreativeAgent {
    /// 稳定的角色名
    pub name: &'static str,
    /// 提示词模板
    pub template: PromptTemplate,
    /// 参数映射，按键逐步累积，调用前固定
    pub arguments: HashMap<String, String>,
    /// 构建期附着的能力上下文
    pub capability: Capability,
}

impl CreativeAgent {
    pub fn new(name: &'static str, template: PromptTemplate, capability: Capability) -> Self {
        Self {
            name,
            template,
            arguments: HashMap::new(),
            capability,
        }
    }

    /// 绑定一个模板参数
    pub fn bind_argument(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.arguments.insert(key.into(), value.into());
    }

    /// 渲染后的系统指令
    pub fn instructions(&self) -> String {
        self.template.render(&self.arguments)
    }

    /// 渲染后的启动消息
    pub fn kickoff(&self) -> String {
        self.template.render_kickoff(&self.arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_agent() -> CreativeAgent {
        let template = PromptTemplate::parse(
            r#"
name = "writer"
description = "writes"
template = "Write using {{$research_results}} and {{$product_results}}."
kickoff = "Assignment: {{$assignment}}"
variables = ["research_results", "product_results", "assignment"]
"#,
        )
        .unwrap();
        CreativeAgent::new(WRITER_NAME, template, Capability::Plain)
    }

    #[test]
    fn test_bind_argument_renders_into_instructions() {
        let mut agent = sample_agent();
        agent.bind_argument("research_results", "r1");
        agent.bind_argument("product_results", "m1");
        agent.bind_argument("assignment", "write a post");

        assert_eq!(agent.instructions(), "Write using r1 and m1.");
        assert_eq!(agent.kickoff(), "Assignment: write a post");
    }

    #[test]
    fn test_binding_is_idempotent_for_identical_values() {
        let mut first = sample_agent();
        let mut second = sample_agent();
        for agent in [&mut first, &mut second] {
            agent.bind_argument("research_results", "r1");
            agent.bind_argument("product_results", "m1");
            agent.bind_argument("assignment", "task");
        }
        // 相同的累积参数产生完全一致的绑定状态
        assert_eq!(first.arguments, second.arguments);
        assert_eq!(first.instructions(), second.instructions());

        // 重复绑定同一值不改变状态
        first.bind_argument("assignment", "task");
        assert_eq!(first.arguments, second.arguments);
    }
}
