//! 引擎错误类型
//!
//! 与 Autopilot 配合：步骤执行中的错误默认被记录为失败 Observation（会话不中断），
//! 仅当步骤声明 handle_error = false 时向调用方原样传播。

use thiserror::Error;

/// 引擎运行过程中可能出现的错误（用户可见异常、密钥缺失、步骤失败、宿主 I/O 等）
#[derive(Error, Debug)]
pub enum EngineError {
    /// 通过 raise_exception 主动抛出的用户可见异常，永不重试
    #[error("{title}: {message}")]
    UserFacing {
        message: String,
        title: String,
        /// 抛出该异常的步骤名（如有）
        step_name: Option<String>,
    },

    /// 宿主无法提供所需密钥；由调用步骤决定中止或重新提示
    #[error("Secret unavailable: {0}")]
    SecretUnavailable(String),

    #[error("Step execution failed: {0}")]
    StepFailed(String),

    /// 预留操作的显式信号，禁止静默成功
    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    /// 会话拆除时挂起的等待被取消
    #[error("Cancelled")]
    Cancelled,

    #[error("Host I/O error: {0}")]
    Host(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("LLM error: {0}")]
    Llm(String),
}

impl EngineError {
    /// 失败 Observation 的标题：UserFacing 用自带标题，其余统一为 "Step failed"
    pub fn title(&self) -> &str {
        match self {
            EngineError::UserFacing { title, .. } => title,
            _ => "Step failed",
        }
    }
}
