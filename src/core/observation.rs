//! 步骤执行结果（Observation）
//!
//! 每个步骤执行完毕产生一个 Observation，由 Autopilot 记录到对应 HistoryNode；
//! 失败的步骤记录为 Error 变体而非中断会话。

use serde::{Deserialize, Serialize};

/// 步骤执行产生的结果值
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Observation {
    /// 无有效载荷（如纯副作用步骤）
    None,
    /// 文本输出（Shell 输出、编辑摘要等）
    Text { text: String },
    /// 用户输入（确认步骤等）
    UserInput { input: String },
    /// 失败记录：标题 + 详情
    Error { title: String, message: String },
}

impl Observation {
    /// 文本视图：Text 取 text，UserInput 取 input，Error 取 message，None 为空串
    pub fn text(&self) -> &str {
        match self {
            Observation::None => "",
            Observation::Text { text } => text,
            Observation::UserInput { input } => input,
            Observation::Error { message, .. } => message,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Observation::Error { .. })
    }
}
