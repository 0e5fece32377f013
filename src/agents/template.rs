//! 提示词模板 - 从TOML资源解析出的结构化模板
//!
//! 模板正文使用 `{{$variable}}` 占位符，渲染时用Agent的参数映射
//! 替换。已声明但未绑定的变量渲染为空串。

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::SessionError;

/// 结构化提示词模板
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PromptTemplate {
    /// 模板名（用于远程Agent注册时的身份描述）
    pub name: String,
    /// 模板用途说明
    pub description: String,
    /// 指令正文，渲染后作为Agent的系统提示词
    pub template: String,
    /// 启动用户消息，渲染后作为该Agent首次调用的输入
    pub kickoff: String,
    /// 期望绑定的变量名列表
    #[serde(default)]
    pub variables: Vec<String>,
}

impl PromptTemplate {
    /// 从TOML文件加载模板资源
    pub fn from_file(path: &Path) -> Result<Self, SessionError> {
        Self::try_from_file(path).map_err(|cause| SessionError::TemplateLoad {
            path: path.to_path_buf(),
            cause,
        })
    }

    fn try_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read template file: {:?}", path))?;
        Self::parse(&content)
    }

    /// 解析TOML模板内容
    pub fn parse(content: &str) -> Result<Self> {
        let template: PromptTemplate =
            toml::from_str(content).context("Failed to parse prompt template")?;
        if template.template.trim().is_empty() {
            anyhow::bail!("Prompt template body is empty");
        }
        Ok(template)
    }

    /// 渲染指令正文
    pub fn render(&self, arguments: &HashMap<String, String>) -> String {
        self.substitute(&self.template, arguments)
    }

    /// 渲染启动消息
    pub fn render_kickoff(&self, arguments: &HashMap<String, String>) -> String {
        self.substitute(&self.kickoff, arguments)
    }

    fn substitute(&self, body: &str, arguments: &HashMap<String, String>) -> String {
        let mut rendered = body.to_string();
        for (key, value) in arguments {
            rendered = rendered.replace(&format!("{{{{${}}}}}", key), value);
        }
        // 已声明但未绑定的变量清空，避免占位符泄漏到模型输入
        for variable in &self.variables {
            rendered = rendered.replace(&format!("{{{{${}}}}}", variable), "");
        }
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
name = "researcher"
description = "Web research agent"
template = "You research topics.\nContext: {{$research_context}}"
kickoff = "Research the following: {{$research_context}}"
variables = ["research_context"]
"#;

    #[test]
    fn test_parse_template() {
        let template = PromptTemplate::parse(SAMPLE).unwrap();
        assert_eq!(template.name, "researcher");
        assert_eq!(template.variables, vec!["research_context"]);
    }

    #[test]
    fn test_render_substitutes_bound_variables() {
        let template = PromptTemplate::parse(SAMPLE).unwrap();
        let mut arguments = HashMap::new();
        arguments.insert("research_context".to_string(), "rust async".to_string());

        let rendered = template.render(&arguments);
        assert!(rendered.contains("Context: rust async"));
        let kickoff = template.render_kickoff(&arguments);
        assert_eq!(kickoff, "Research the following: rust async");
    }

    #[test]
    fn test_render_blanks_unbound_declared_variables() {
        let template = PromptTemplate::parse(SAMPLE).unwrap();
        let rendered = template.render(&HashMap::new());
        assert_eq!(rendered, "You research topics.\nContext: ");
    }

    #[test]
    fn test_render_is_idempotent_for_identical_arguments() {
        let template = PromptTemplate::parse(SAMPLE).unwrap();
        let mut arguments = HashMap::new();
        arguments.insert("research_context".to_string(), "topic".to_string());

        assert_eq!(template.render(&arguments), template.render(&arguments));
    }

    #[test]
    fn test_parse_rejects_empty_body() {
        let result = PromptTemplate::parse(
            r#"
name = "x"
description = "y"
template = "  "
kickoff = "z"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file_missing_resource() {
        let err = PromptTemplate::from_file(Path::new("/nonexistent/researcher.toml")).unwrap_err();
        assert!(matches!(err, SessionError::TemplateLoad { .. }));
    }
}
