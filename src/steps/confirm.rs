//! 用户确认步骤
//!
//! 挂起编排流程直到宿主送达用户输入；会话拆除时以 Cancelled 失败而非无限等待。

use async_trait::async_trait;

use crate::core::{EngineError, Observation, Step};
use crate::sdk::Sdk;

/// 确认步骤：prompt 进入转录，输入作为 Observation 返回
pub struct WaitForUserConfirmationStep {
    prompt: String,
}

impl WaitForUserConfirmationStep {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

#[async_trait]
impl Step for WaitForUserConfirmationStep {
    fn name(&self) -> Option<String> {
        Some("Wait for confirmation".to_string())
    }

    fn description(&self) -> Option<String> {
        Some(self.prompt.clone())
    }

    async fn run(&self, sdk: &Sdk) -> Result<Observation, EngineError> {
        let input = sdk.wait_for_user_input().await?;
        Ok(Observation::UserInput { input })
    }
}
