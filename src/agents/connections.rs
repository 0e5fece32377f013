//! 具名工具连接注册表
//!
//! 按众所周知的连接名（如 `bingGrounding`）解析外部工具连接。

use std::collections::HashMap;

use crate::config::ConnectionConfig;
use crate::error::SessionError;

/// 一个已解析的外部工具连接句柄
#[derive(Debug, Clone, PartialEq)]
pub struct ToolConnection {
    pub name: String,
    pub endpoint: String,
    pub api_key: String,
}

/// 工具连接注册表 - 从配置构建的只读查找表
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<String, ToolConnection>,
}

impl ConnectionRegistry {
    pub fn from_config(connections: &HashMap<String, ConnectionConfig>) -> Self {
        let connections = connections
            .iter()
            .map(|(name, config)| {
                (
                    name.clone(),
                    ToolConnection {
                        name: name.clone(),
                        endpoint: config.endpoint.clone(),
                        api_key: config.api_key.clone(),
                    },
                )
            })
            .collect();
        Self { connections }
    }

    /// 按名称解析连接，缺失时返回 `ConnectionNotFound`
    pub fn resolve(&self, name: &str) -> Result<ToolConnection, SessionError> {
        self.connections
            .get(name)
            .cloned()
            .ok_or_else(|| SessionError::ConnectionNotFound {
                name: name.to_string(),
            })
    }
}
