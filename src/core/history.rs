//! 历史记录：已执行步骤的有序可变记录
//!
//! HistoryNode 在步骤开始执行时追加（快照步骤元数据），执行结束后补记 Observation；
//! current_index 始终指向最后（或正在执行）的节点。追加单调，正常运行期间不重排不删除。
//! to_chat_history 从时间线派生聊天转录，供 LLM 上下文使用。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::Observation;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条聊天消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 单个已执行（或正在执行）步骤的记录
///
/// 步骤元数据在追加时快照；身份由时间线中的位置决定，无独立 id。
/// Observation 记录后节点不再变化，仅 chat_context 可继续追加。
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryNode {
    pub name: Option<String>,
    pub description: Option<String>,
    /// 隐藏节点不参与聊天转录
    pub hidden: bool,
    /// 执行期间事后附加的聊天上下文
    pub chat_context: Vec<ChatMessage>,
    /// 执行结束前为 None
    pub observation: Option<Observation>,
    pub created_at: DateTime<Utc>,
}

impl HistoryNode {
    pub fn new(name: Option<String>, description: Option<String>, hidden: bool) -> Self {
        Self {
            name,
            description,
            hidden,
            chat_context: Vec::new(),
            observation: None,
            created_at: Utc::now(),
        }
    }
}

/// 有序历史：时间线 + 当前游标
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct History {
    timeline: Vec<HistoryNode>,
    current_index: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加节点并把 current_index 推进到它，返回其下标
    pub fn append(&mut self, node: HistoryNode) -> usize {
        self.timeline.push(node);
        let index = self.timeline.len() - 1;
        self.current_index = Some(index);
        index
    }

    /// 补记指定节点的 Observation
    pub fn record_observation(&mut self, index: usize, observation: Observation) {
        if let Some(node) = self.timeline.get_mut(index) {
            node.observation = Some(observation);
        }
    }

    /// 向当前节点追加聊天上下文；历史为空时返回 false
    pub fn add_chat_context(&mut self, message: ChatMessage) -> bool {
        match self.current_index.and_then(|i| self.timeline.get_mut(i)) {
            Some(node) => {
                node.chat_context.push(message);
                true
            }
            None => false,
        }
    }

    /// 派生聊天转录：按时间线顺序，每个非隐藏节点先出 description（assistant 角色），
    /// 再出该节点的 chat_context 条目
    pub fn to_chat_history(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::new();
        for node in &self.timeline {
            if node.hidden {
                continue;
            }
            if let Some(description) = &node.description {
                messages.push(ChatMessage::assistant(description.clone()));
            }
            messages.extend(node.chat_context.iter().cloned());
        }
        messages
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn get(&self, index: usize) -> Option<&HistoryNode> {
        self.timeline.get(index)
    }

    pub fn timeline(&self) -> &[HistoryNode] {
        &self.timeline
    }

    pub fn len(&self) -> usize {
        self.timeline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }
}
