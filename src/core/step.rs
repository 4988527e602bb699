//! 步骤抽象
//!
//! 步骤是开放的多态家族（文件系统编辑、Shell、确认、模型改写，以及宿主自定义的新种类），
//! 因此定义为 trait 而非封闭枚举。步骤只通过传入的 Sdk 门面访问特权操作，
//! 不持有编排器引用。

use async_trait::async_trait;

use crate::core::{EngineError, Observation};
use crate::sdk::Sdk;

/// 步骤 trait：元数据 + 异步执行
///
/// 元数据在步骤开始执行时被 Autopilot 快照到 HistoryNode；
/// 身份由历史中的位置决定。
#[async_trait]
pub trait Step: Send + Sync {
    /// 步骤名（可选，显示用）
    fn name(&self) -> Option<String> {
        None
    }

    /// 步骤描述（可选，进入聊天转录）
    fn description(&self) -> Option<String> {
        None
    }

    /// 隐藏步骤不参与聊天转录
    fn hidden(&self) -> bool {
        false
    }

    /// true（默认）：执行失败由 Autopilot 记录为失败 Observation，会话继续；
    /// false：失败在记录之外还向调用方原样传播
    fn handle_error(&self) -> bool {
        true
    }

    /// 执行步骤；所有特权操作经由 sdk
    async fn run(&self, sdk: &Sdk) -> Result<Observation, EngineError>;
}
