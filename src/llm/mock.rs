//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 默认回显最后一条 User 消息；with_response 可设定固定回复（如带围栏的代码块），
//! 便于离线驱动模型改写步骤。

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::stream;

use crate::core::{ChatMessage, Role};
use crate::llm::LlmClient;

/// Mock 客户端：固定回复或回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockLlmClient {
    canned: Option<String>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 固定回复
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            canned: Some(response.into()),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, String> {
        if let Some(canned) = &self.canned {
            return Ok(canned.clone());
        }
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        Ok(format!("Echo from Mock: {}", last_user))
    }

    async fn complete_stream(
        &self,
        messages: &[ChatMessage],
    ) -> Result<Pin<Box<dyn futures_util::Stream<Item = Result<String, String>> + Send>>, String>
    {
        let content = self.complete(messages).await?;
        Ok(Box::pin(stream::iter(vec![Ok(content)])))
    }
}
