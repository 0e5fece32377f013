//! Writer/Editor评审循环状态机
//!
//! 严格交替：Writer产出后轮到Editor，Editor产出后回到Writer，
//! 除非终止条件成立。终止条件：最近一个回合由Editor产出且内容
//! 包含接受短语（大小写不敏感），或回合计数达到上限。

use crate::agents::{EDITOR_NAME, WRITER_NAME};

/// Editor接受文章时使用的短语（匹配大小写不敏感）
pub const ACCEPTANCE_PHRASE: &str = "article accepted";

/// 评审循环状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    WriterTurn,
    EditorTurn,
    Terminated,
}

/// 评审循环状态机
#[derive(Debug)]
pub struct ReviewLoop {
    state: ReviewState,
    turns_taken: u32,
    max_turns: u32,
    accepted: bool,
}

impl ReviewLoop {
    pub fn new(max_turns: u32) -> Self {
        Self {
            state: ReviewState::WriterTurn,
            turns_taken: 0,
            max_turns,
            accepted: false,
        }
    }

    pub fn state(&self) -> ReviewState {
        self.state
    }

    pub fn turns_taken(&self) -> u32 {
        self.turns_taken
    }

    /// Editor是否已接受文章
    pub fn accepted(&self) -> bool {
        self.accepted
    }

    /// 当前应产出回合的角色，终止后为None
    pub fn current_agent(&self) -> Option<&'static str> {
        match self.state {
            ReviewState::WriterTurn => Some(WRITER_NAME),
            ReviewState::EditorTurn => Some(EDITOR_NAME),
            ReviewState::Terminated => None,
        }
    }

    /// 记录一个已产出的回合并推进状态
    pub fn advance(&mut self, author: &str, content: &str) -> ReviewState {
        if self.state == ReviewState::Terminated {
            return self.state;
        }

        self.turns_taken += 1;

        // 终止判定只在Editor的回合上求值
        if author == EDITOR_NAME && Self::is_acceptance(content) {
            self.accepted = true;
            self.state = ReviewState::Terminated;
        } else if self.turns_taken >= self.max_turns {
            // 回合上限：Editor永不接受时的安全兜底
            self.state = ReviewState::Terminated;
        } else {
            self.state = match self.state {
                ReviewState::WriterTurn => ReviewState::EditorTurn,
                ReviewState::EditorTurn => ReviewState::WriterTurn,
                ReviewState::Terminated => ReviewState::Terminated,
            };
        }
        self.state
    }

    /// 接受短语判定（大小写不敏感的子串匹配）
    pub fn is_acceptance(content: &str) -> bool {
        content.to_lowercase().contains(ACCEPTANCE_PHRASE)
    }
}
