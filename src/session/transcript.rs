//! 会话转录 - 只追加的回合历史

use chrono::{DateTime, Utc};

/// 一个回合：某个Agent对当前累积历史的一次响应
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// 只追加的回合序列，不重排、不裁剪
#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, author: &str, content: &str) -> &Turn {
        self.turns.push(Turn::new(author, content));
        self.turns.last().expect("transcript just appended")
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn latest(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
