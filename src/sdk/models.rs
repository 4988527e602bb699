//! 密钥门控的模型资源缓存
//!
//! 每个命名资源（chat / deepseek）首次访问时：向宿主取密钥 -> 构造客户端 -> 缓存，
//! 进程内至多构造一次；并发首访会合并到同一次构造上，密钥提示只发一次。
//! 访问器本身就是 await OnceCell 初始化 future，不存在同步桥接的重入风险。

use std::future::Future;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::config::AppConfig;
use crate::core::EngineError;
use crate::host::Host;
use crate::llm::{create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient};

/// 共享 LLM 客户端句柄
pub type SharedLlm = Arc<dyn LlmClient>;

/// 两态缓存（未初始化 | 就绪）：至多一次异步构造，并发首访共享同一次结果
#[derive(Debug, Default)]
pub struct SecretGated<T> {
    cell: OnceCell<T>,
}

impl<T: Clone> SecretGated<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// 取缓存值；未初始化时运行 init（失败不缓存，下次重试）
    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<T, EngineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        self.cell.get_or_try_init(init).await.map(|v| v.clone())
    }

    /// 预置缓存值（宿主注入或测试）；已初始化时返回 false
    pub fn preset(&self, value: T) -> bool {
        self.cell.set(value).is_ok()
    }

    pub fn initialized(&self) -> bool {
        self.cell.initialized()
    }
}

/// 命名模型资源：每个访问器都是懒加载 + 进程级缓存
pub struct Models {
    host: Arc<dyn Host>,
    cfg: Arc<AppConfig>,
    chat: SecretGated<SharedLlm>,
    deepseek: SecretGated<SharedLlm>,
}

impl Models {
    pub fn new(host: Arc<dyn Host>, cfg: Arc<AppConfig>) -> Self {
        Self {
            host,
            cfg,
            chat: SecretGated::new(),
            deepseek: SecretGated::new(),
        }
    }

    /// 配置的默认聊天模型；provider 决定后端（openai / deepseek / mock）
    pub async fn chat(&self) -> Result<SharedLlm, EngineError> {
        self.chat
            .get_or_try_init(|| async {
                let provider = self.cfg.llm.provider.to_lowercase();
                match provider.as_str() {
                    "deepseek" => self.build_deepseek().await,
                    "openai" => self.build_openai().await,
                    "mock" => Ok(Arc::new(MockLlmClient::new()) as SharedLlm),
                    other => {
                        tracing::warn!(provider = %other, "unknown provider, using Mock LLM");
                        Ok(Arc::new(MockLlmClient::new()) as SharedLlm)
                    }
                }
            })
            .await
    }

    /// DeepSeek 客户端（独立缓存项，密钥 DEEPSEEK_API_KEY）
    pub async fn deepseek(&self) -> Result<SharedLlm, EngineError> {
        self.deepseek
            .get_or_try_init(|| self.build_deepseek())
            .await
    }

    /// 预置聊天模型（宿主注入或测试）；绕过密钥获取
    pub fn preset_chat(&self, client: SharedLlm) -> bool {
        self.chat.preset(client)
    }

    async fn build_openai(&self) -> Result<SharedLlm, EngineError> {
        let api_key = self.host.get_user_secret("OPENAI_API_KEY").await?;
        let model = self
            .cfg
            .llm
            .openai
            .model
            .clone()
            .unwrap_or_else(|| self.cfg.llm.model.clone());
        tracing::info!(model = %model, "constructed OpenAI-compatible chat client");
        Ok(Arc::new(OpenAiClient::new(
            self.cfg.llm.base_url.as_deref(),
            &model,
            Some(&api_key),
        )))
    }

    async fn build_deepseek(&self) -> Result<SharedLlm, EngineError> {
        let api_key = self.host.get_user_secret("DEEPSEEK_API_KEY").await?;
        let model = self.cfg.llm.deepseek.model.clone();
        tracing::info!("constructed DeepSeek chat client");
        Ok(Arc::new(create_deepseek_client(model.as_deref(), &api_key)))
    }
}
